use super::Wiring;
use crate::output::{health_label, print_json, print_table};
use dr_core::report::{HealthReport, ResultBody, StepReport, TestReport};
use dr_core::{Action, ActionRequest, DrConfig, ProcedureResult, Step};

/// Build a request for an ordered procedure. Unknown step names, and skip
/// lists that are not a leading run of the procedure's plan, are rejected
/// before anything is wired up.
pub fn request(action: Action, skip_steps: &[String]) -> anyhow::Result<ActionRequest> {
    let steps = skip_steps
        .iter()
        .map(|name| {
            Step::parse(name).ok_or_else(|| anyhow::anyhow!("unknown step '{name}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let request = ActionRequest::new(action).with_skip_steps(steps);
    request.validate()?;
    Ok(request)
}

pub fn run(config: DrConfig, request: ActionRequest, json: bool) -> anyhow::Result<()> {
    let wiring = Wiring::connect(&config)?;
    let orchestrator = wiring.orchestrator(config);
    tracing::info!(
        invocation_id = %orchestrator.invocation_id(),
        action = %request.action,
        "dispatching"
    );
    let result = orchestrator.dispatch(&request);

    if json {
        print_json(&result)?;
    } else {
        print_human(&result);
    }

    match &result.body {
        ResultBody::Error(e) => anyhow::bail!("{}", e.error),
        _ => Ok(()),
    }
}

fn print_human(result: &ProcedureResult) {
    match &result.body {
        ResultBody::Health(report) => print_health(report),
        ResultBody::DrTest(report) => print_test(report),
        ResultBody::Procedure(report) => print_steps(report),
        ResultBody::Error(report) => {
            if let Some(steps) = &report.steps_completed {
                println!("Steps completed before failure: {}", join_steps(steps));
            }
        }
    }
}

fn print_health(report: &HealthReport) {
    let detail = |status: &Option<String>, error: &Option<String>| {
        error
            .clone()
            .or_else(|| status.clone())
            .unwrap_or_default()
    };
    let lag = &report.replication_lag;
    let lag_detail = match (lag.lag_seconds, &lag.error) {
        (Some(secs), _) => format!("{secs:.1}s (threshold {:.0}s)", lag.threshold_seconds.unwrap_or(0.0)),
        (None, Some(e)) => e.clone(),
        (None, None) => String::new(),
    };

    print_table(
        &["CHECK", "HEALTH", "DETAIL"],
        vec![
            vec![
                "primary_db".to_string(),
                health_label(report.primary_db.healthy),
                detail(&report.primary_db.status, &report.primary_db.error),
            ],
            vec![
                "dr_replica".to_string(),
                health_label(report.dr_replica.healthy),
                detail(&report.dr_replica.status, &report.dr_replica.error),
            ],
            vec![
                "replication_lag".to_string(),
                health_label(lag.healthy),
                lag_detail,
            ],
            vec![
                "dns_health".to_string(),
                health_label(report.dns_health.healthy),
                detail(&report.dns_health.status, &report.dns_health.error),
            ],
        ],
    );
    println!();
    println!("Overall:  {}", report.overall_status);
}

fn print_test(report: &TestReport) {
    let r = &report.test_results;
    let row = |name: &str, success: bool, error: &Option<String>| {
        vec![
            name.to_string(),
            if success { "pass" } else { "fail" }.to_string(),
            error.clone().unwrap_or_default(),
        ]
    };
    print_table(
        &["PROBE", "RESULT", "ERROR"],
        vec![
            row(
                "dr_replica_connectivity",
                r.dr_replica_connectivity.success,
                &r.dr_replica_connectivity.error,
            ),
            row(
                "failover_simulation",
                r.failover_simulation.success,
                &r.failover_simulation.error,
            ),
            row(
                "monitoring_alerts",
                r.monitoring_alerts.success,
                &r.monitoring_alerts.error,
            ),
            row(
                "backup_integrity",
                r.backup_integrity.success,
                &r.backup_integrity.error,
            ),
        ],
    );
    println!();
    println!(
        "Overall:  {}",
        if report.overall_success { "PASSED" } else { "FAILED" }
    );
}

fn print_steps(report: &StepReport) {
    println!("{}", report.message);
    println!("Steps:    {}", join_steps(&report.steps_completed));
}

fn join_steps(steps: &[Step]) -> String {
    if steps.is_empty() {
        return "(none)".to_string();
    }
    steps
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
