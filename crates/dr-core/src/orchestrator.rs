//! The DR orchestrator: one instance per invocation.
//!
//! `dispatch` is the catch-all boundary. Procedures return `Result`; any
//! `Err` reaching `dispatch` becomes a status-500 [`ProcedureResult`] and an
//! ERROR notification (unless the procedure already sent one).
//!
//! ```text
//! ActionRequest ──► dispatch ──► health_check      (contained sub-checks)
//!                        │  ├──► initiate_failover (ordered, fail-fast)
//!                        │  ├──► initiate_failback (ordered, fail-fast)
//!                        │  └──► test_dr           (contained probes)
//!                        ▼
//!                 ProcedureResult / NotificationSink
//! ```

use crate::collaborators::{
    Clock, DatabasePlane, DnsPlane, InstanceDescription, MetricsCollector, NotificationSink,
    RecordChange, RecordType, ReplicaSpec, STATUS_AVAILABLE,
};
use crate::config::DrConfig;
use crate::error::{DrError, Result};
use crate::health;
use crate::report::{
    AlertProbe, BackupProbe, ErrorReport, HealthReport, InstanceCheck, InvocationResponse,
    Notification, ProbeReport, ProcedureResult, ResultBody, SimulatedFailover, StepReport,
    TestReport, TestResults,
};
use crate::types::{Action, ActionRequest, OverallStatus, Severity, Step};
use crate::wait::wait_for_status;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Everything the orchestrator talks to, injected at construction.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Control plane in the primary region.
    pub primary: &'a dyn DatabasePlane,
    /// Control plane in the DR region.
    pub replica: &'a dyn DatabasePlane,
    pub metrics: &'a dyn MetricsCollector,
    pub dns: &'a dyn DnsPlane,
    pub notifier: &'a dyn NotificationSink,
    pub clock: &'a dyn Clock,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    config: DrConfig,
    deps: Collaborators<'a>,
    invocation_id: Uuid,
    timestamp: DateTime<Utc>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: DrConfig, deps: Collaborators<'a>) -> Self {
        let timestamp = deps.clock.now();
        Self {
            config,
            deps,
            invocation_id: Uuid::new_v4(),
            timestamp,
        }
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Invocation contract: event JSON in, `{statusCode, body}` out.
    pub fn handle_event(&self, event: &serde_json::Value) -> InvocationResponse {
        let result = match ActionRequest::from_event(event) {
            Ok(request) => self.dispatch(&request),
            Err(e) => self.fail(e),
        };
        let status_code = result.status_code;
        result.into_response().unwrap_or_else(|e| InvocationResponse {
            status_code,
            body: serde_json::json!({ "error": e.to_string() }).to_string(),
        })
    }

    pub fn dispatch(&self, request: &ActionRequest) -> ProcedureResult {
        let span = tracing::info_span!(
            "dr",
            invocation_id = %self.invocation_id,
            action = %request.action,
            cluster = %self.config.cluster_name
        );
        let _enter = span.enter();

        match self.route(request) {
            Ok(result) => result,
            Err(e) => self.fail(e),
        }
    }

    fn route(&self, request: &ActionRequest) -> Result<ProcedureResult> {
        match request.validate()? {
            Action::HealthCheck => self.health_check(),
            Action::Failover => self.initiate_failover(&request.skip_steps),
            Action::Failback => self.initiate_failback(&request.skip_steps),
            Action::TestDr => self.test_dr(),
        }
    }

    fn fail(&self, err: DrError) -> ProcedureResult {
        let error_msg = format!("DR Automation failed: {err}");
        tracing::error!(error = %err, "dr action failed");
        if !err.is_notified() {
            self.send_notification(&error_msg, Severity::Error);
        }
        ProcedureResult::error(
            self.invocation_id,
            ErrorReport {
                error: error_msg,
                steps_completed: err.steps_completed().map(<[Step]>::to_vec),
                timestamp: self.timestamp,
            },
        )
    }

    // -----------------------------------------------------------------------
    // Health check
    // -----------------------------------------------------------------------

    /// Run all four sub-checks and aggregate them. Never fails.
    pub fn health_report(&self) -> HealthReport {
        let replica_id = self.config.replica_identifier();
        HealthReport::assemble(
            health::check_primary(self.deps.primary, &self.config.db_identifier),
            health::check_replica(self.deps.replica, &replica_id),
            health::check_replication_lag(
                self.deps.metrics,
                &replica_id,
                self.config.thresholds.replication_lag_secs,
                self.deps.clock.now(),
            ),
            health::check_dns(self.deps.dns, self.config.dns.health_check_id.as_deref()),
            self.timestamp,
        )
    }

    pub fn health_check(&self) -> Result<ProcedureResult> {
        let report = self.health_report();
        tracing::info!(overall_status = %report.overall_status, "health check complete");

        if report.overall_status == OverallStatus::Unhealthy {
            let details = serde_json::to_string_pretty(&report)?;
            self.send_notification(
                &format!("DR Health Check Failed: {details}"),
                Severity::Warning,
            );
        }

        Ok(ProcedureResult::ok(
            self.invocation_id,
            ResultBody::Health(report),
        ))
    }

    // -----------------------------------------------------------------------
    // Failover
    // -----------------------------------------------------------------------

    pub fn initiate_failover(&self, skip: &[Step]) -> Result<ProcedureResult> {
        self.preflight(Step::FAILOVER_PLAN, skip)?;
        self.send_notification("Starting DR failover procedure", Severity::Info);

        let mut steps = Vec::new();
        if let Err(e) = self.run_failover(&mut steps, skip) {
            return Err(self.abort("Failover", steps, e));
        }

        self.send_notification(
            &format!(
                "DR Failover completed successfully. Steps: {}",
                format_steps(&steps)
            ),
            Severity::Success,
        );
        Ok(self.completed("Failover initiated successfully", steps))
    }

    fn run_failover(&self, steps: &mut Vec<Step>, skip: &[Step]) -> Result<()> {
        let replica_id = self.config.replica_identifier();

        if should_run(Step::PromotedReplica, skip, steps) {
            self.deps.replica.promote_read_replica(&replica_id)?;
            complete(steps, Step::PromotedReplica);
        }

        let mut promoted = None;
        if should_run(Step::ReplicaPromotionComplete, skip, steps) {
            promoted = Some(self.wait_available(self.deps.replica, &replica_id)?);
            complete(steps, Step::ReplicaPromotionComplete);
        }

        if should_run(Step::DnsUpdated, skip, steps) {
            let target = match promoted {
                Some(instance) => instance,
                None => self.deps.replica.describe_instance(&replica_id)?,
            };
            self.repoint_dns(&target)?;
            complete(steps, Step::DnsUpdated);
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Failback
    // -----------------------------------------------------------------------

    pub fn initiate_failback(&self, skip: &[Step]) -> Result<ProcedureResult> {
        self.preflight(Step::FAILBACK_PLAN, skip)?;
        self.send_notification("Starting failback procedure", Severity::Info);

        let mut steps = Vec::new();
        if let Err(e) = self.run_failback(&mut steps, skip) {
            return Err(self.abort("Failback", steps, e));
        }

        self.send_notification(
            &format!(
                "Failback completed successfully. Steps: {}",
                format_steps(&steps)
            ),
            Severity::Success,
        );
        Ok(self.completed("Failback completed successfully", steps))
    }

    fn run_failback(&self, steps: &mut Vec<Step>, skip: &[Step]) -> Result<()> {
        // The precondition is re-checked even when a previous run verified it.
        let primary = health::check_primary(self.deps.primary, &self.config.db_identifier);
        if !primary.healthy {
            let reason = primary
                .error
                .or(primary.status)
                .unwrap_or_else(|| "unknown".to_string());
            return Err(DrError::DependencyUnhealthy(format!(
                "Primary database is not healthy, cannot failback ({reason})"
            )));
        }
        complete(steps, Step::PrimaryHealthVerified);

        let replica_id = self.config.failback_replica_identifier();

        if should_run(Step::ReplicaReestablished, skip, steps) {
            self.deps.replica.create_read_replica(&ReplicaSpec {
                identifier: replica_id.clone(),
                source_identifier: self.config.db_identifier.clone(),
                source_region: self.config.primary_region.clone(),
            })?;
            complete(steps, Step::ReplicaReestablished);
        }

        if should_run(Step::ReplicaSyncComplete, skip, steps) {
            self.wait_available(self.deps.replica, &replica_id)?;
            complete(steps, Step::ReplicaSyncComplete);
        }

        if should_run(Step::DnsReverted, skip, steps) {
            let primary = self
                .deps
                .primary
                .describe_instance(&self.config.db_identifier)?;
            self.repoint_dns(&primary)?;
            complete(steps, Step::DnsReverted);
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // DR test
    // -----------------------------------------------------------------------

    pub fn test_dr(&self) -> Result<ProcedureResult> {
        let test_results = TestResults {
            dr_replica_connectivity: self.probe_replica_connectivity(),
            failover_simulation: simulate_failover(),
            monitoring_alerts: self.probe_monitoring_alerts(),
            backup_integrity: self.probe_backup_integrity(),
        };
        let overall_success = test_results.all_succeeded();
        tracing::info!(overall_success, "dr test complete");

        let details = serde_json::to_string_pretty(&test_results)?;
        self.send_notification(
            &format!(
                "DR Test Results: {}\nDetails: {details}",
                if overall_success { "PASSED" } else { "FAILED" }
            ),
            Severity::Info,
        );

        Ok(ProcedureResult::ok(
            self.invocation_id,
            ResultBody::DrTest(TestReport {
                test_results,
                overall_success,
                timestamp: self.timestamp,
            }),
        ))
    }

    fn probe_replica_connectivity(&self) -> ProbeReport<InstanceCheck> {
        let check = health::check_replica(self.deps.replica, &self.config.replica_identifier());
        ProbeReport::passed(check.healthy, check)
    }

    fn probe_monitoring_alerts(&self) -> ProbeReport<AlertProbe> {
        ProbeReport::from_result(
            self.try_notify("DR Test Alert", Severity::Test)
                .map(|()| (true, AlertProbe { alert_sent: true })),
        )
    }

    fn probe_backup_integrity(&self) -> ProbeReport<BackupProbe> {
        ProbeReport::from_result(self.verify_backups())
    }

    fn verify_backups(&self) -> Result<(bool, BackupProbe)> {
        let max_age_hours = self.config.thresholds.backup_max_age_hours;
        let snapshots = self
            .deps
            .primary
            .list_snapshots(&self.config.db_identifier)?;
        let latest = snapshots
            .into_iter()
            .filter(|s| s.status == STATUS_AVAILABLE)
            .max_by_key(|s| s.created_at);

        let now = self.deps.clock.now();
        let verified = latest
            .as_ref()
            .is_some_and(|s| now - s.created_at <= ChronoDuration::hours(max_age_hours));

        Ok((
            verified,
            BackupProbe {
                backups_verified: verified,
                latest_snapshot: latest.as_ref().map(|s| s.identifier.clone()),
                latest_snapshot_at: latest.map(|s| s.created_at),
                max_age_hours,
            },
        ))
    }

    // -----------------------------------------------------------------------
    // Shared step helpers
    // -----------------------------------------------------------------------

    /// Rejects a run that could not finish cleanly, before any collaborator
    /// is touched.
    fn preflight(&self, plan: &[Step], skip: &[Step]) -> Result<()> {
        Step::check_resume(plan, skip)?;
        if self.config.thresholds.poll_interval_secs == 0 {
            return Err(DrError::Config(
                "thresholds.poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn wait_available(
        &self,
        plane: &dyn DatabasePlane,
        identifier: &str,
    ) -> Result<InstanceDescription> {
        wait_for_status(
            plane,
            self.deps.clock,
            identifier,
            STATUS_AVAILABLE,
            self.config.thresholds.max_wait(),
            self.config.thresholds.poll_interval(),
        )
    }

    fn repoint_dns(&self, target: &InstanceDescription) -> Result<()> {
        let dns = &self.config.dns;
        let (Some(zone_id), Some(record_name)) = (&dns.hosted_zone_id, &dns.record_name) else {
            return Err(DrError::Config(
                "dns.hosted_zone_id and dns.record_name are required to repoint DNS".to_string(),
            ));
        };
        let Some(endpoint) = &target.endpoint else {
            return Err(DrError::DependencyUnhealthy(format!(
                "instance {} has no endpoint to point DNS at",
                target.identifier
            )));
        };

        tracing::info!(record = %record_name, target = %endpoint, "repointing dns");
        self.deps.dns.upsert_record(&RecordChange {
            zone_id: zone_id.clone(),
            record_name: record_name.clone(),
            record_type: RecordType::Cname,
            ttl: dns.ttl,
            value: endpoint.clone(),
        })
    }

    fn abort(&self, procedure: &'static str, steps: Vec<Step>, cause: DrError) -> DrError {
        let err = DrError::StepFailure {
            procedure,
            steps_completed: steps,
            source: Box::new(cause),
        };
        tracing::error!(error = %err, "procedure aborted");
        self.send_notification(&err.to_string(), Severity::Error);
        err
    }

    fn completed(&self, message: &str, steps: Vec<Step>) -> ProcedureResult {
        ProcedureResult::ok(
            self.invocation_id,
            ResultBody::Procedure(StepReport {
                message: message.to_string(),
                steps_completed: steps,
                timestamp: self.timestamp,
            }),
        )
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    fn try_notify(&self, message: &str, severity: Severity) -> Result<()> {
        let notification = Notification {
            message: message.to_string(),
            severity,
            timestamp: self.timestamp,
            environment: self.config.environment.clone(),
        };
        self.deps
            .notifier
            .publish(&notification.subject(), &notification.body())
    }

    /// Fire-and-forget: a sink failure is logged and otherwise ignored.
    pub fn send_notification(&self, message: &str, severity: Severity) {
        if let Err(e) = self.try_notify(message, severity) {
            tracing::warn!(%severity, error = %e, "failed to send notification");
        }
    }
}

fn simulate_failover() -> ProbeReport<SimulatedFailover> {
    ProbeReport::passed(
        true,
        SimulatedFailover {
            simulated_steps: Step::FAILOVER_PLAN.to_vec(),
        },
    )
}

/// Returns false (and records the step as done) when a previous run already
/// completed it.
fn should_run(step: Step, skip: &[Step], steps: &mut Vec<Step>) -> bool {
    if skip.contains(&step) {
        tracing::info!(%step, "skipping step completed by a previous run");
        steps.push(step);
        return false;
    }
    true
}

fn complete(steps: &mut Vec<Step>, step: Step) {
    tracing::info!(%step, "step complete");
    steps.push(step);
}

fn format_steps(steps: &[Step]) -> String {
    let names: Vec<&str> = steps.iter().map(|s| s.as_str()).collect();
    format!("[{}]", names.join(", "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
