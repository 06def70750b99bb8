use crate::collaborators::{Clock, DatabasePlane, InstanceDescription};
use crate::error::{DrError, Result};
use std::time::Duration;

/// Poll `identifier` until it reports `target`, sleeping `interval` between
/// describes. Gives up once the accumulated sleep reaches `max_wait`. A zero
/// interval is rejected.
pub fn wait_for_status(
    plane: &dyn DatabasePlane,
    clock: &dyn Clock,
    identifier: &str,
    target: &str,
    max_wait: Duration,
    interval: Duration,
) -> Result<InstanceDescription> {
    if interval.is_zero() {
        return Err(DrError::Config(
            "poll interval must be greater than zero".to_string(),
        ));
    }

    let mut waited = Duration::ZERO;
    while waited < max_wait {
        let instance = plane.describe_instance(identifier)?;
        if instance.status == target {
            return Ok(instance);
        }
        tracing::debug!(
            identifier,
            status = %instance.status,
            target,
            waited_secs = waited.as_secs(),
            "waiting for database status"
        );
        clock.sleep(interval);
        waited += interval;
    }

    Err(DrError::TimeoutExceeded {
        identifier: identifier.to_string(),
        target: target.to_string(),
        waited_secs: max_wait.as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClock, FakeDatabase};

    #[test]
    fn returns_once_target_reached() {
        let db = FakeDatabase::new();
        db.script_statuses("db-dr-replica", &["modifying", "modifying", "available"]);
        let clock = FakeClock::new();

        let instance = wait_for_status(
            &db,
            &clock,
            "db-dr-replica",
            "available",
            Duration::from_secs(1800),
            Duration::from_secs(30),
        )
        .unwrap();

        assert_eq!(instance.status, "available");
        assert_eq!(db.describe_calls("db-dr-replica"), 3);
        assert_eq!(clock.slept(), Duration::from_secs(60));
    }

    #[test]
    fn times_out_after_max_wait() {
        let db = FakeDatabase::new();
        db.script_statuses("db-dr-replica", &["modifying"]);
        let clock = FakeClock::new();

        let err = wait_for_status(
            &db,
            &clock,
            "db-dr-replica",
            "available",
            Duration::from_secs(120),
            Duration::from_secs(30),
        )
        .unwrap_err();

        assert!(matches!(err, DrError::TimeoutExceeded { waited_secs: 120, .. }));
        assert_eq!(db.describe_calls("db-dr-replica"), 4);
        assert_eq!(clock.slept(), Duration::from_secs(120));
    }

    #[test]
    fn zero_interval_is_rejected_without_polling() {
        let db = FakeDatabase::new();
        db.script_statuses("db-dr-replica", &["modifying"]);
        let clock = FakeClock::new();

        let err = wait_for_status(
            &db,
            &clock,
            "db-dr-replica",
            "available",
            Duration::from_secs(1800),
            Duration::ZERO,
        )
        .unwrap_err();

        assert!(matches!(err, DrError::Config(_)));
        assert_eq!(db.describe_calls("db-dr-replica"), 0);
    }

    #[test]
    fn describe_error_propagates() {
        let db = FakeDatabase::new();
        let clock = FakeClock::new();

        let err = wait_for_status(
            &db,
            &clock,
            "missing",
            "available",
            Duration::from_secs(60),
            Duration::from_secs(30),
        )
        .unwrap_err();

        assert!(matches!(err, DrError::InstanceNotFound(id) if id == "missing"));
        assert_eq!(clock.slept(), Duration::ZERO);
    }
}
