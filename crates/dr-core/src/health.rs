//! Health sub-checks. Each one contains its own failures: an error from a
//! collaborator becomes `healthy: false` plus the error text, never a
//! propagated `Err`.

use crate::collaborators::{
    DatabasePlane, Datapoint, Dimension, DnsPlane, MetricQuery, MetricsCollector, Statistic,
};
use crate::error::Result;
use crate::report::{DnsCheck, InstanceCheck, LagCheck};
use chrono::{DateTime, Duration as ChronoDuration, DurationRound, Utc};

pub const LAG_NAMESPACE: &str = "AWS/RDS";
pub const LAG_METRIC: &str = "ReplicaLag";
pub const LAG_PERIOD_SECS: u32 = 300;
pub const NO_LAG_METRICS: &str = "No replication lag metrics available";

pub fn check_primary(plane: &dyn DatabasePlane, identifier: &str) -> InstanceCheck {
    match plane.describe_instance(identifier) {
        Ok(instance) => InstanceCheck {
            healthy: instance.is_available(),
            status: Some(instance.status),
            endpoint: instance.endpoint,
            multi_az: Some(instance.multi_az),
            ..InstanceCheck::default()
        },
        Err(e) => {
            tracing::warn!(identifier, error = %e, "primary database check failed");
            InstanceCheck::failed(e.to_string())
        }
    }
}

pub fn check_replica(plane: &dyn DatabasePlane, identifier: &str) -> InstanceCheck {
    match plane.describe_instance(identifier) {
        Ok(instance) => InstanceCheck {
            healthy: instance.is_available(),
            status: Some(instance.status),
            endpoint: instance.endpoint,
            read_replica_source: instance.read_replica_source,
            ..InstanceCheck::default()
        },
        Err(e) => {
            tracing::warn!(identifier, error = %e, "replica check failed");
            InstanceCheck::failed(e.to_string())
        }
    }
}

/// Query window for the lag metric: top of the current hour through `now`.
pub fn lag_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.duration_trunc(ChronoDuration::hours(1)).unwrap_or(now);
    (start, now)
}

pub fn lag_query(replica_identifier: &str, now: DateTime<Utc>) -> MetricQuery {
    let (start_time, end_time) = lag_window(now);
    MetricQuery {
        namespace: LAG_NAMESPACE.to_string(),
        metric_name: LAG_METRIC.to_string(),
        dimensions: vec![Dimension {
            name: "DBInstanceIdentifier".to_string(),
            value: replica_identifier.to_string(),
        }],
        start_time,
        end_time,
        period_secs: LAG_PERIOD_SECS,
        statistics: vec![Statistic::Average],
    }
}

fn latest_average(datapoints: &[Datapoint]) -> Option<f64> {
    datapoints
        .iter()
        .filter(|d| d.average.is_some())
        .max_by_key(|d| d.timestamp)
        .and_then(|d| d.average)
}

pub fn check_replication_lag(
    metrics: &dyn MetricsCollector,
    replica_identifier: &str,
    threshold_secs: f64,
    now: DateTime<Utc>,
) -> LagCheck {
    let query = lag_query(replica_identifier, now);
    match metrics.get_metric_statistics(&query) {
        Ok(datapoints) => match latest_average(&datapoints) {
            Some(lag) => LagCheck {
                healthy: lag < threshold_secs,
                lag_seconds: Some(lag),
                threshold_seconds: Some(threshold_secs),
                error: None,
            },
            None => LagCheck::failed(NO_LAG_METRICS),
        },
        Err(e) => {
            tracing::warn!(replica_identifier, error = %e, "replication lag check failed");
            LagCheck::failed(e.to_string())
        }
    }
}

pub fn check_dns(dns: &dyn DnsPlane, health_check_id: Option<&str>) -> DnsCheck {
    let Some(id) = health_check_id else {
        return DnsCheck {
            healthy: true,
            status: Some("unmonitored".to_string()),
            ..DnsCheck::default()
        };
    };
    let lookup = || -> Result<DnsCheck> {
        let status = dns.health_check_status(id)?;
        Ok(DnsCheck {
            healthy: status.healthy,
            status: Some(status.status),
            health_check_id: Some(id.to_string()),
            error: None,
        })
    };
    lookup().unwrap_or_else(|e| {
        tracing::warn!(health_check_id = id, error = %e, "dns health check failed");
        DnsCheck {
            health_check_id: Some(id.to_string()),
            ..DnsCheck::failed(e.to_string())
        }
    })
}
