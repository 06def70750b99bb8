//! In-memory collaborators shared by the unit tests.

use crate::collaborators::{
    Clock, DatabasePlane, Datapoint, DnsHealthStatus, DnsPlane, InstanceDescription,
    MetricQuery, MetricsCollector, NotificationSink, RecordChange, ReplicaSpec, Snapshot,
};
use crate::config::DrConfig;
use crate::error::{DrError, Result};
use crate::orchestrator::{Collaborators, Orchestrator};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

fn injected(operation: &str) -> DrError {
    DrError::Gateway {
        operation: operation.to_string(),
        status: 503,
        message: "injected failure".to_string(),
    }
}

// ---------------------------------------------------------------------------
// FakeDatabase
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDatabase {
    instances: RefCell<HashMap<String, InstanceDescription>>,
    scripted: RefCell<HashMap<String, VecDeque<String>>>,
    describes: RefCell<HashMap<String, usize>>,
    failing_describes: RefCell<HashSet<String>>,
    snapshots: RefCell<HashMap<String, Vec<Snapshot>>>,
    pub promotes: RefCell<Vec<String>>,
    pub created: RefCell<Vec<ReplicaSpec>>,
    pub fail_promote: Cell<bool>,
    pub fail_create: Cell<bool>,
    pub fail_snapshots: Cell<bool>,
    calls: Cell<usize>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, instance: InstanceDescription) {
        self.instances
            .borrow_mut()
            .insert(instance.identifier.clone(), instance);
    }

    pub fn insert_available(&self, identifier: &str, source: Option<&str>) {
        self.insert(InstanceDescription {
            identifier: identifier.to_string(),
            status: "available".to_string(),
            endpoint: Some(format!("{identifier}.db.example.internal")),
            multi_az: true,
            read_replica_source: source.map(str::to_string),
        });
    }

    /// Statuses returned by successive describes; the last one sticks.
    pub fn script_statuses(&self, identifier: &str, statuses: &[&str]) {
        self.scripted.borrow_mut().insert(
            identifier.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn fail_describe(&self, identifier: &str) {
        self.failing_describes
            .borrow_mut()
            .insert(identifier.to_string());
    }

    pub fn set_snapshots(&self, identifier: &str, snapshots: Vec<Snapshot>) {
        self.snapshots
            .borrow_mut()
            .insert(identifier.to_string(), snapshots);
    }

    pub fn describe_calls(&self, identifier: &str) -> usize {
        self.describes
            .borrow()
            .get(identifier)
            .copied()
            .unwrap_or(0)
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn next_status(&self, identifier: &str) -> Option<String> {
        let mut scripted = self.scripted.borrow_mut();
        let queue = scripted.get_mut(identifier)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl DatabasePlane for FakeDatabase {
    fn describe_instance(&self, identifier: &str) -> Result<InstanceDescription> {
        self.calls.set(self.calls.get() + 1);
        *self
            .describes
            .borrow_mut()
            .entry(identifier.to_string())
            .or_default() += 1;

        if self.failing_describes.borrow().contains(identifier) {
            return Err(injected("describe_instance"));
        }

        let scripted = self.next_status(identifier);
        let known = self.instances.borrow().get(identifier).cloned();
        match (known, scripted) {
            (Some(mut instance), Some(status)) => {
                instance.status = status;
                Ok(instance)
            }
            (Some(instance), None) => Ok(instance),
            (None, Some(status)) => Ok(InstanceDescription {
                identifier: identifier.to_string(),
                status,
                endpoint: Some(format!("{identifier}.db.example.internal")),
                multi_az: false,
                read_replica_source: None,
            }),
            (None, None) => Err(DrError::InstanceNotFound(identifier.to_string())),
        }
    }

    fn promote_read_replica(&self, identifier: &str) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_promote.get() {
            return Err(injected("promote_read_replica"));
        }
        self.promotes.borrow_mut().push(identifier.to_string());
        if let Some(instance) = self.instances.borrow_mut().get_mut(identifier) {
            instance.read_replica_source = None;
        }
        Ok(())
    }

    fn create_read_replica(&self, spec: &ReplicaSpec) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_create.get() {
            return Err(injected("create_read_replica"));
        }
        self.created.borrow_mut().push(spec.clone());
        Ok(())
    }

    fn list_snapshots(&self, identifier: &str) -> Result<Vec<Snapshot>> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_snapshots.get() {
            return Err(injected("list_snapshots"));
        }
        Ok(self
            .snapshots
            .borrow()
            .get(identifier)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// FakeMetrics
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeMetrics {
    pub datapoints: RefCell<Vec<Datapoint>>,
    pub fail: Cell<bool>,
    pub queries: RefCell<Vec<MetricQuery>>,
}

impl FakeMetrics {
    pub fn set_lag(&self, at: DateTime<Utc>, average: f64) {
        *self.datapoints.borrow_mut() = vec![Datapoint {
            timestamp: at,
            average: Some(average),
        }];
    }
}

impl MetricsCollector for FakeMetrics {
    fn get_metric_statistics(&self, query: &MetricQuery) -> Result<Vec<Datapoint>> {
        self.queries.borrow_mut().push(query.clone());
        if self.fail.get() {
            return Err(injected("get_metric_statistics"));
        }
        Ok(self.datapoints.borrow().clone())
    }
}

// ---------------------------------------------------------------------------
// FakeDns
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDns {
    pub health: RefCell<Option<DnsHealthStatus>>,
    pub upserts: RefCell<Vec<RecordChange>>,
    pub fail_upsert: Cell<bool>,
    calls: Cell<usize>,
}

impl FakeDns {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl DnsPlane for FakeDns {
    fn health_check_status(&self, health_check_id: &str) -> Result<DnsHealthStatus> {
        self.calls.set(self.calls.get() + 1);
        self.health
            .borrow()
            .clone()
            .ok_or_else(|| DrError::InstanceNotFound(health_check_id.to_string()))
    }

    fn upsert_record(&self, change: &RecordChange) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_upsert.get() {
            return Err(injected("upsert_record"));
        }
        self.upserts.borrow_mut().push(change.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeSink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSink {
    pub published: RefCell<Vec<(String, String)>>,
    pub fail: Cell<bool>,
}

impl FakeSink {
    /// Messages published with the given severity tag in their subject.
    pub fn with_severity(&self, severity: &str) -> Vec<String> {
        let marker = format!(" - {severity} - ");
        self.published
            .borrow()
            .iter()
            .filter(|(subject, _)| subject.contains(&marker))
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn count(&self, severity: &str) -> usize {
        self.with_severity(severity).len()
    }
}

impl NotificationSink for FakeSink {
    fn publish(&self, subject: &str, message: &str) -> Result<()> {
        if self.fail.get() {
            return Err(DrError::NotificationFailure("topic unreachable".to_string()));
        }
        self.published
            .borrow_mut()
            .push((subject.to_string(), message.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeClock
// ---------------------------------------------------------------------------

pub struct FakeClock {
    now: Cell<DateTime<Utc>>,
    slept: Cell<Duration>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 15, 0).unwrap())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(now),
            slept: Cell::new(Duration::ZERO),
        }
    }

    pub fn slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.set(self.slept.get() + duration);
        let step = ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::zero());
        self.now.set(self.now.get() + step);
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A full set of fakes describing a healthy deployment of `orders-db`.
pub struct Harness {
    pub config: DrConfig,
    pub primary: FakeDatabase,
    pub replica: FakeDatabase,
    pub metrics: FakeMetrics,
    pub dns: FakeDns,
    pub sink: FakeSink,
    pub clock: FakeClock,
}

impl Harness {
    pub fn healthy() -> Self {
        let mut config = DrConfig::new("orders-db");
        config.environment = "test".to_string();
        config.notification_topic = Some("dr-alerts".to_string());
        config.dns.hosted_zone_id = Some("Z123".to_string());
        config.dns.record_name = Some("db.example.com".to_string());
        config.dns.health_check_id = Some("hc-1".to_string());

        let clock = FakeClock::new();
        let now = clock.now();

        let primary = FakeDatabase::new();
        primary.insert_available("orders-db", None);
        primary.set_snapshots(
            "orders-db",
            vec![Snapshot {
                identifier: "rds:orders-db-2026-03-01".to_string(),
                status: "available".to_string(),
                created_at: now - ChronoDuration::hours(3),
            }],
        );

        let replica = FakeDatabase::new();
        replica.insert_available("orders-db-dr-replica", Some("orders-db"));

        let metrics = FakeMetrics::default();
        metrics.set_lag(now - ChronoDuration::minutes(5), 12.0);

        let dns = FakeDns::default();
        *dns.health.borrow_mut() = Some(DnsHealthStatus {
            healthy: true,
            status: "Success".to_string(),
        });

        Self {
            config,
            primary,
            replica,
            metrics,
            dns,
            sink: FakeSink::default(),
            clock,
        }
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(
            self.config.clone(),
            Collaborators {
                primary: &self.primary,
                replica: &self.replica,
                metrics: &self.metrics,
                dns: &self.dns,
                notifier: &self.sink,
                clock: &self.clock,
            },
        )
    }

    /// Calls made to every collaborator except the notification sink.
    pub fn infrastructure_calls(&self) -> usize {
        self.primary.calls()
            + self.replica.calls()
            + self.metrics.queries.borrow().len()
            + self.dns.calls()
    }
}
