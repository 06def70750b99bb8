#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "DR_CONFIG",
    "ENVIRONMENT",
    "PRIMARY_REGION",
    "DR_REGION",
    "CLUSTER_NAME",
    "DB_IDENTIFIER",
    "SNS_TOPIC_ARN",
    "DR_GATEWAY_URL",
];

fn dr(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dr-automation").unwrap();
    cmd.current_dir(dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &TempDir, yaml: &str) {
    std::fs::write(dir.path().join("dr.yaml"), yaml).unwrap();
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_reports_missing_identifier() {
    let dir = TempDir::new().unwrap();
    dr(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] db_identifier is required"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_validate_accepts_complete_file() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "db_identifier: orders-db\nnotification_topic: dr-alerts\ndns:\n  hosted_zone_id: Z123\n  record_name: db.example.com\n",
    );
    dr(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_show_applies_env_overrides() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "db_identifier: orders-db\nenvironment: staging\n");
    let output = dr(&dir)
        .env("ENVIRONMENT", "dr-drill")
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["db_identifier"], "orders-db");
    assert_eq!(value["environment"], "dr-drill");
    assert_eq!(value["thresholds"]["max_wait_secs"], 1800);
}

// ---------------------------------------------------------------------------
// procedures
// ---------------------------------------------------------------------------

#[test]
fn procedure_without_gateway_url_fails() {
    let dir = TempDir::new().unwrap();
    dr(&dir)
        .args(["--db-identifier", "orders-db", "health-check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gateway_url is not set"));
}

#[test]
fn unknown_skip_step_is_rejected() {
    let dir = TempDir::new().unwrap();
    dr(&dir)
        .args([
            "--db-identifier",
            "orders-db",
            "failover",
            "--skip-step",
            "reboot",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown step 'reboot'"));
}

#[test]
fn skip_list_with_gap_is_rejected() {
    let dir = TempDir::new().unwrap();
    dr(&dir)
        .args([
            "--db-identifier",
            "orders-db",
            "failover",
            "--skip-step",
            "dns_updated",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "step dns_updated cannot be skipped before promoted_replica",
        ));
}

#[test]
fn health_check_against_gateway() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/regions/us-east-1/instances/orders-db")
        .with_status(200)
        .with_body(json!({ "status": "available", "endpoint": "primary.internal", "multi_az": true }).to_string())
        .create();
    server
        .mock("GET", "/regions/us-west-2/instances/orders-db-dr-replica")
        .with_status(200)
        .with_body(json!({ "status": "available", "read_replica_source": "orders-db" }).to_string())
        .create();
    let metrics = server
        .mock("POST", "/metrics/statistics")
        .with_status(200)
        .with_body(json!({ "datapoints": [{ "timestamp": "2026-03-01T12:00:00Z", "average": 3.0 }] }).to_string())
        .create();

    let output = dr(&dir)
        .args([
            "--db-identifier",
            "orders-db",
            "--gateway-url",
            &server.url(),
            "--json",
            "health-check",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    metrics.assert();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status_code"], 200);
    assert_eq!(value["body"]["overall_status"], "healthy");
    assert_eq!(value["body"]["dns_health"]["status"], "unmonitored");
}

#[test]
fn failover_against_gateway() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "db_identifier: orders-db\nnotification_topic: dr-alerts\ndns:\n  hosted_zone_id: Z123\n  record_name: db.example.com\n",
    );
    let mut server = mockito::Server::new();
    let promote = server
        .mock("POST", "/regions/us-west-2/instances/orders-db-dr-replica/promote")
        .with_status(202)
        .expect(1)
        .create();
    server
        .mock("GET", "/regions/us-west-2/instances/orders-db-dr-replica")
        .with_status(200)
        .with_body(json!({ "status": "available", "endpoint": "replica.internal" }).to_string())
        .create();
    let dns = server
        .mock("PUT", "/dns/zones/Z123/records")
        .match_body(mockito::Matcher::PartialJson(json!({ "value": "replica.internal" })))
        .with_status(200)
        .create();
    let success = server
        .mock("POST", "/topics/dr-alerts/messages")
        .match_body(mockito::Matcher::PartialJson(
            json!({ "subject": "DR Automation - SUCCESS - production" }),
        ))
        .with_status(200)
        .expect(1)
        .create();
    server
        .mock("POST", "/topics/dr-alerts/messages")
        .with_status(200)
        .create();

    dr(&dir)
        .args(["--gateway-url", &server.url(), "failover"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Failover initiated successfully"))
        .stdout(predicate::str::contains(
            "promoted_replica, replica_promotion_complete, dns_updated",
        ));

    promote.assert();
    dns.assert();
    success.assert();
}

// ---------------------------------------------------------------------------
// invoke
// ---------------------------------------------------------------------------

#[test]
fn invoke_unknown_action_returns_500_envelope() {
    let dir = TempDir::new().unwrap();
    let output = dr(&dir)
        .args([
            "--db-identifier",
            "orders-db",
            "--gateway-url",
            "http://127.0.0.1:9",
            "invoke",
            "--event",
            r#"{"action": "reboot"}"#,
        ])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["statusCode"], 500);
    let body: serde_json::Value =
        serde_json::from_str(envelope["body"].as_str().unwrap()).unwrap();
    assert_eq!(body["error"], "DR Automation failed: Unknown action: reboot");
    let invocation_id = body["invocation_id"].as_str().unwrap();
    assert_eq!(invocation_id.len(), 36);
}

#[test]
fn invoke_reads_event_from_stdin() {
    let dir = TempDir::new().unwrap();
    dr(&dir)
        .args([
            "--db-identifier",
            "orders-db",
            "--gateway-url",
            "http://127.0.0.1:9",
            "invoke",
        ])
        .write_stdin("not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("event is not valid JSON"));
}
