//! Blocking HTTP collaborators that speak JSON to a control-plane gateway.
//!
//! The gateway fronts the provider's database, metrics, DNS and topic APIs
//! under one base URL. Paths:
//!
//! ```text
//! GET  /regions/{region}/instances/{id}
//! POST /regions/{region}/instances/{id}/promote
//! POST /regions/{region}/instances
//! GET  /regions/{region}/instances/{id}/snapshots
//! POST /metrics/statistics
//! GET  /dns/health-checks/{id}
//! PUT  /dns/zones/{zone}/records
//! POST /topics/{topic}/messages
//! ```

use crate::collaborators::{
    DatabasePlane, Datapoint, DnsHealthStatus, DnsPlane, InstanceDescription, MetricQuery,
    MetricsCollector, NotificationSink, RecordChange, ReplicaSpec, Snapshot,
};
use crate::error::{DrError, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// GatewayClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(DrError::Config("gateway url must not be empty".to_string()));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        tracing::debug!(operation, "gateway request");
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().unwrap_or_default();
        Err(DrError::Gateway {
            operation: operation.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<T> {
        let response = self.send(operation, self.client.get(self.url(path)))?;
        Ok(response.json()?)
    }

    /// Database plane for one region.
    pub fn database(&self, region: impl Into<String>) -> GatewayDatabase {
        GatewayDatabase {
            gateway: self.clone(),
            region: region.into(),
        }
    }

    pub fn notifier(&self, topic: Option<String>) -> GatewayNotifier {
        GatewayNotifier {
            gateway: self.clone(),
            topic,
        }
    }
}

// ---------------------------------------------------------------------------
// Database plane
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireInstance {
    status: String,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    multi_az: bool,
    #[serde(default)]
    read_replica_source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GatewayDatabase {
    gateway: GatewayClient,
    region: String,
}

impl GatewayDatabase {
    fn instance_path(&self, identifier: &str) -> String {
        format!("/regions/{}/instances/{}", self.region, identifier)
    }
}

impl DatabasePlane for GatewayDatabase {
    fn describe_instance(&self, identifier: &str) -> Result<InstanceDescription> {
        let wire: WireInstance = self
            .gateway
            .get_json("describe_instance", &self.instance_path(identifier))
            .map_err(|e| match e {
                DrError::Gateway { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
                    DrError::InstanceNotFound(identifier.to_string())
                }
                other => other,
            })?;
        Ok(InstanceDescription {
            identifier: identifier.to_string(),
            status: wire.status,
            endpoint: wire.endpoint,
            multi_az: wire.multi_az,
            read_replica_source: wire.read_replica_source,
        })
    }

    fn promote_read_replica(&self, identifier: &str) -> Result<()> {
        let path = format!("{}/promote", self.instance_path(identifier));
        self.gateway.send(
            "promote_read_replica",
            self.gateway.client.post(self.gateway.url(&path)),
        )?;
        Ok(())
    }

    fn create_read_replica(&self, spec: &ReplicaSpec) -> Result<()> {
        let path = format!("/regions/{}/instances", self.region);
        self.gateway.send(
            "create_read_replica",
            self.gateway.client.post(self.gateway.url(&path)).json(spec),
        )?;
        Ok(())
    }

    fn list_snapshots(&self, identifier: &str) -> Result<Vec<Snapshot>> {
        let path = format!("{}/snapshots", self.instance_path(identifier));
        self.gateway.get_json("list_snapshots", &path)
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireStatistics {
    #[serde(default)]
    datapoints: Vec<Datapoint>,
}

impl MetricsCollector for GatewayClient {
    fn get_metric_statistics(&self, query: &MetricQuery) -> Result<Vec<Datapoint>> {
        let response = self.send(
            "get_metric_statistics",
            self.client.post(self.url("/metrics/statistics")).json(query),
        )?;
        let wire: WireStatistics = response.json()?;
        Ok(wire.datapoints)
    }
}

// ---------------------------------------------------------------------------
// DNS
// ---------------------------------------------------------------------------

impl DnsPlane for GatewayClient {
    fn health_check_status(&self, health_check_id: &str) -> Result<DnsHealthStatus> {
        self.get_json(
            "health_check_status",
            &format!("/dns/health-checks/{health_check_id}"),
        )
    }

    fn upsert_record(&self, change: &RecordChange) -> Result<()> {
        let path = format!("/dns/zones/{}/records", change.zone_id);
        self.send("upsert_record", self.client.put(self.url(&path)).json(change))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    subject: &'a str,
    message: &'a str,
}

/// Publishes to a topic, or only logs when no topic is configured.
#[derive(Debug, Clone)]
pub struct GatewayNotifier {
    gateway: GatewayClient,
    topic: Option<String>,
}

impl NotificationSink for GatewayNotifier {
    fn publish(&self, subject: &str, message: &str) -> Result<()> {
        let Some(topic) = &self.topic else {
            tracing::info!(subject, "no notification topic configured: {message}");
            return Ok(());
        };
        let path = format!("/topics/{topic}/messages");
        self.gateway
            .send(
                "publish",
                self.gateway
                    .client
                    .post(self.gateway.url(&path))
                    .json(&WireMessage { subject, message }),
            )
            .map_err(|e| DrError::NotificationFailure(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
