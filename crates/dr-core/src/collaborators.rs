//! Seams between the orchestrator and the infrastructure it drives.
//!
//! Each trait covers one control plane. The orchestrator never assumes
//! anything about transport; [`crate::gateway`] provides HTTP
//! implementations and tests substitute in-memory fakes.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Database control plane
// ---------------------------------------------------------------------------

/// What a describe call reports about one database instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDescription {
    pub identifier: String,
    pub status: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub multi_az: bool,
    /// Upstream source identifier while the instance is a read replica.
    #[serde(default)]
    pub read_replica_source: Option<String>,
}

impl InstanceDescription {
    pub fn is_available(&self) -> bool {
        self.status == STATUS_AVAILABLE
    }
}

pub const STATUS_AVAILABLE: &str = "available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicaSpec {
    pub identifier: String,
    pub source_identifier: String,
    pub source_region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub identifier: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Control plane for managed database instances in one region.
pub trait DatabasePlane {
    fn describe_instance(&self, identifier: &str) -> Result<InstanceDescription>;

    /// Detach a read replica from its source, making it a standalone
    /// writable instance. Not idempotent.
    fn promote_read_replica(&self, identifier: &str) -> Result<()>;

    fn create_read_replica(&self, spec: &ReplicaSpec) -> Result<()>;

    fn list_snapshots(&self, identifier: &str) -> Result<Vec<Snapshot>>;
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Average,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub period_secs: u32,
    pub statistics: Vec<Statistic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub average: Option<f64>,
}

pub trait MetricsCollector {
    /// Zero or more datapoints, in no guaranteed order.
    fn get_metric_statistics(&self, query: &MetricQuery) -> Result<Vec<Datapoint>>;
}

// ---------------------------------------------------------------------------
// DNS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsHealthStatus {
    pub healthy: bool,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    Cname,
}

/// Upsert of a single record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordChange {
    pub zone_id: String,
    pub record_name: String,
    pub record_type: RecordType,
    pub ttl: u32,
    pub value: String,
}

pub trait DnsPlane {
    fn health_check_status(&self, health_check_id: &str) -> Result<DnsHealthStatus>;

    fn upsert_record(&self, change: &RecordChange) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub trait NotificationSink {
    fn publish(&self, subject: &str, message: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
