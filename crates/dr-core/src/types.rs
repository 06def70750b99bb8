use crate::error::{DrError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    HealthCheck,
    #[serde(rename = "initiate_failover", alias = "failover")]
    Failover,
    Failback,
    TestDr,
}

impl Action {
    pub fn all() -> &'static [Action] {
        &[
            Action::HealthCheck,
            Action::Failover,
            Action::Failback,
            Action::TestDr,
        ]
    }

    /// Ordered steps the action runs; empty for the read-only actions.
    pub fn plan(self) -> &'static [Step] {
        match self {
            Action::Failover => Step::FAILOVER_PLAN,
            Action::Failback => Step::FAILBACK_PLAN,
            Action::HealthCheck | Action::TestDr => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::HealthCheck => "health_check",
            Action::Failover => "initiate_failover",
            Action::Failback => "failback",
            Action::TestDr => "test_dr",
        }
    }

    /// Parse a wire tag. `failover` is accepted as an alias of
    /// `initiate_failover`.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "health_check" => Ok(Action::HealthCheck),
            "initiate_failover" | "failover" => Ok(Action::Failover),
            "failback" => Ok(Action::Failback),
            "test_dr" => Ok(Action::TestDr),
            other => Err(DrError::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionRequest
// ---------------------------------------------------------------------------

/// One invocation's worth of input. The action tag is kept as the raw
/// string so an unknown tag can be rejected inside `dispatch`, where the
/// failure is reported like any other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default = "default_action_tag")]
    pub action: String,
    /// Steps a previous partial run already completed; ordered procedures
    /// skip them instead of repeating non-idempotent calls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_steps: Vec<Step>,
}

fn default_action_tag() -> String {
    Action::HealthCheck.as_str().to_string()
}

impl ActionRequest {
    pub fn new(action: Action) -> Self {
        Self {
            action: action.as_str().to_string(),
            skip_steps: Vec::new(),
        }
    }

    pub fn with_skip_steps(mut self, steps: Vec<Step>) -> Self {
        self.skip_steps = steps;
        self
    }

    /// Parse an invocation event. Anything that is not an object with an
    /// optional string `action` is rejected as an invalid action.
    pub fn from_event(event: &serde_json::Value) -> Result<Self> {
        let Some(obj) = event.as_object() else {
            return Err(DrError::InvalidAction(format!(
                "event must be a JSON object, got {event}"
            )));
        };
        if let Some(action) = obj.get("action") {
            if !action.is_string() {
                return Err(DrError::InvalidAction(action.to_string()));
            }
        }
        serde_json::from_value(event.clone()).map_err(|e| DrError::InvalidAction(e.to_string()))
    }

    /// Parse the action tag and check `skip_steps` against its plan.
    pub fn validate(&self) -> Result<Action> {
        let action = Action::parse(&self.action)?;
        Step::check_resume(action.plan(), &self.skip_steps)?;
        Ok(action)
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A named unit of progress inside an ordered procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    PromotedReplica,
    ReplicaPromotionComplete,
    DnsUpdated,
    PrimaryHealthVerified,
    ReplicaReestablished,
    ReplicaSyncComplete,
    DnsReverted,
}

impl Step {
    pub const FAILOVER_PLAN: &'static [Step] = &[
        Step::PromotedReplica,
        Step::ReplicaPromotionComplete,
        Step::DnsUpdated,
    ];

    pub const FAILBACK_PLAN: &'static [Step] = &[
        Step::PrimaryHealthVerified,
        Step::ReplicaReestablished,
        Step::ReplicaSyncComplete,
        Step::DnsReverted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::PromotedReplica => "promoted_replica",
            Step::ReplicaPromotionComplete => "replica_promotion_complete",
            Step::DnsUpdated => "dns_updated",
            Step::PrimaryHealthVerified => "primary_health_verified",
            Step::ReplicaReestablished => "replica_reestablished",
            Step::ReplicaSyncComplete => "replica_sync_complete",
            Step::DnsReverted => "dns_reverted",
        }
    }

    /// A resumed run may only skip a leading run of `plan`, which is what a
    /// failed run reports as `steps_completed`.
    pub fn check_resume(plan: &[Step], skip: &[Step]) -> Result<()> {
        if let Some(stray) = skip.iter().find(|&s| !plan.contains(s)) {
            return Err(DrError::InvalidRequest(format!(
                "step {stray} is not part of this procedure"
            )));
        }
        let done = plan.iter().take_while(|&s| skip.contains(s)).count();
        if let Some(gap) = skip.iter().find(|&s| !plan[..done].contains(s)) {
            return Err(DrError::InvalidRequest(format!(
                "step {gap} cannot be skipped before {} has completed",
                plan[done]
            )));
        }
        Ok(())
    }

    pub fn parse(s: &str) -> Option<Step> {
        Step::FAILOVER_PLAN
            .iter()
            .chain(Step::FAILBACK_PLAN)
            .copied()
            .find(|step| step.as_str() == s)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
    Test,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Success => "SUCCESS",
            Severity::Test => "TEST",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OverallStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Healthy,
    Unhealthy,
}

impl OverallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Healthy => "healthy",
            OverallStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
