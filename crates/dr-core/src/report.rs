//! Typed results returned by the orchestrator's procedures.

use crate::error::Result;
use crate::types::{OverallStatus, Severity, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Health report
// ---------------------------------------------------------------------------

/// Status of one database instance as seen by a health sub-check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceCheck {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_az: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_replica_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstanceCheck {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LagCheck {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lag_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LagCheck {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsCheck {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DnsCheck {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub primary_db: InstanceCheck,
    pub dr_replica: InstanceCheck,
    pub replication_lag: LagCheck,
    /// Informational only; never affects `overall_status`.
    pub dns_health: DnsCheck,
    pub overall_status: OverallStatus,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn assemble(
        primary_db: InstanceCheck,
        dr_replica: InstanceCheck,
        replication_lag: LagCheck,
        dns_health: DnsCheck,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let overall_status =
            if primary_db.healthy && dr_replica.healthy && replication_lag.healthy {
                OverallStatus::Healthy
            } else {
                OverallStatus::Unhealthy
            };
        Self {
            primary_db,
            dr_replica,
            replication_lag,
            dns_health,
            overall_status,
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// DR test report
// ---------------------------------------------------------------------------

/// Outcome of one DR test probe. `details` is absent when the probe itself
/// errored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ProbeReport<T> {
    pub fn passed(success: bool, details: T) -> Self {
        Self {
            success,
            details: Some(details),
            error: None,
        }
    }

    pub fn errored(error: impl Into<String>) -> Self {
        Self {
            success: false,
            details: None,
            error: Some(error.into()),
        }
    }

    /// Fold a fallible probe body into a report.
    pub fn from_result(result: Result<(bool, T)>) -> Self {
        match result {
            Ok((success, details)) => Self::passed(success, details),
            Err(e) => Self::errored(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedFailover {
    pub simulated_steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertProbe {
    pub alert_sent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupProbe {
    pub backups_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_snapshot_at: Option<DateTime<Utc>>,
    pub max_age_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    pub dr_replica_connectivity: ProbeReport<InstanceCheck>,
    pub failover_simulation: ProbeReport<SimulatedFailover>,
    pub monitoring_alerts: ProbeReport<AlertProbe>,
    pub backup_integrity: ProbeReport<BackupProbe>,
}

impl TestResults {
    pub fn all_succeeded(&self) -> bool {
        self.dr_replica_connectivity.success
            && self.failover_simulation.success
            && self.monitoring_alerts.success
            && self.backup_integrity.success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub test_results: TestResults,
    pub overall_success: bool,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Procedure result
// ---------------------------------------------------------------------------

/// Body of a completed failover or failback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub message: String,
    pub steps_completed: Vec<Step>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_completed: Option<Vec<Step>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultBody {
    Health(HealthReport),
    DrTest(TestReport),
    Procedure(StepReport),
    Error(ErrorReport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureResult {
    pub status_code: u16,
    pub invocation_id: Uuid,
    pub body: ResultBody,
}

impl ProcedureResult {
    pub fn ok(invocation_id: Uuid, body: ResultBody) -> Self {
        Self {
            status_code: 200,
            invocation_id,
            body,
        }
    }

    pub fn error(invocation_id: Uuid, report: ErrorReport) -> Self {
        Self {
            status_code: 500,
            invocation_id,
            body: ResultBody::Error(report),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    pub fn steps_completed(&self) -> &[Step] {
        match &self.body {
            ResultBody::Procedure(r) => &r.steps_completed,
            ResultBody::Error(r) => r.steps_completed.as_deref().unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Envelope for the invocation contract. The invocation id rides along
    /// inside the body object.
    pub fn into_response(self) -> Result<InvocationResponse> {
        let mut body = serde_json::to_value(&self.body)?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert(
                "invocation_id".to_string(),
                serde_json::Value::String(self.invocation_id.to_string()),
            );
        }
        Ok(InvocationResponse {
            status_code: self.status_code,
            body: body.to_string(),
        })
    }
}

/// Wire shape of the invocation contract: the body is a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

impl Notification {
    pub fn subject(&self) -> String {
        format!("DR Automation - {} - {}", self.severity, self.environment)
    }

    pub fn body(&self) -> String {
        format!(
            "{}\n\nTimestamp: {}\nEnvironment: {}",
            self.message,
            self.timestamp.to_rfc3339(),
            self.environment
        )
    }
}
