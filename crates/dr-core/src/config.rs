use crate::error::{DrError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DnsConfig
// ---------------------------------------------------------------------------

/// The record that failover and failback repoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsConfig {
    #[serde(default)]
    pub hosted_zone_id: Option<String>,
    #[serde(default)]
    pub record_name: Option<String>,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Provider health check polled by the informational DNS sub-check.
    #[serde(default)]
    pub health_check_id: Option<String>,
}

fn default_ttl() -> u32 {
    60
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_lag_threshold")]
    pub replication_lag_secs: f64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
    #[serde(default = "default_backup_max_age")]
    pub backup_max_age_hours: i64,
}

fn default_lag_threshold() -> f64 {
    300.0
}

fn default_poll_interval() -> u64 {
    30
}

fn default_max_wait() -> u64 {
    1800
}

fn default_backup_max_age() -> i64 {
    24
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            replication_lag_secs: default_lag_threshold(),
            poll_interval_secs: default_poll_interval(),
            max_wait_secs: default_max_wait(),
            backup_max_age_hours: default_backup_max_age(),
        }
    }
}

impl Thresholds {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

// ---------------------------------------------------------------------------
// DrConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_primary_region")]
    pub primary_region: String,
    #[serde(default = "default_dr_region")]
    pub dr_region: String,
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
    #[serde(default)]
    pub db_identifier: String,
    /// Overrides the `<db_identifier>-dr-replica` naming convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_identifier: Option<String>,
    /// Identifier of the replica recreated during failback. Defaults to
    /// `<db_identifier>-dr-replica-failback` so it cannot collide with the
    /// instance promoted during failover.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failback_replica_identifier: Option<String>,
    #[serde(default)]
    pub notification_topic: Option<String>,
    /// Base URL of the control-plane gateway the HTTP collaborators talk to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    #[serde(default)]
    pub dns: DnsConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_primary_region() -> String {
    "us-east-1".to_string()
}

fn default_dr_region() -> String {
    "us-west-2".to_string()
}

fn default_cluster_name() -> String {
    "mobile-apps-cluster".to_string()
}

impl Default for DrConfig {
    fn default() -> Self {
        Self::new("")
    }
}

impl DrConfig {
    pub fn new(db_identifier: impl Into<String>) -> Self {
        Self {
            environment: default_environment(),
            primary_region: default_primary_region(),
            dr_region: default_dr_region(),
            cluster_name: default_cluster_name(),
            db_identifier: db_identifier.into(),
            replica_identifier: None,
            failback_replica_identifier: None,
            notification_topic: None,
            gateway_url: None,
            dns: DnsConfig::default(),
            thresholds: Thresholds::default(),
        }
    }

    pub fn replica_identifier(&self) -> String {
        self.replica_identifier
            .clone()
            .unwrap_or_else(|| format!("{}-dr-replica", self.db_identifier))
    }

    pub fn failback_replica_identifier(&self) -> String {
        self.failback_replica_identifier
            .clone()
            .unwrap_or_else(|| format!("{}-dr-replica-failback", self.db_identifier))
    }

    /// Load a YAML config file. A missing file yields the defaults so that
    /// environment overrides alone are enough to run.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: DrConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Fail if the config cannot drive any procedure at all.
    pub fn ensure_runnable(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DrError::Config(errors.join("; ")))
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.db_identifier.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "db_identifier is required".to_string(),
            });
        }

        if self.primary_region == self.dr_region {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "primary_region and dr_region are both '{}'",
                    self.primary_region
                ),
            });
        }

        if self.notification_topic.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "notification_topic is not set; alerts will only be logged".to_string(),
            });
        }

        if self.dns.hosted_zone_id.is_none() || self.dns.record_name.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "dns.hosted_zone_id and dns.record_name must both be set for \
                          failover and failback to repoint DNS"
                    .to_string(),
            });
        }

        let t = &self.thresholds;
        if t.poll_interval_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "thresholds.poll_interval_secs must be greater than zero".to_string(),
            });
        } else if t.max_wait_secs < t.poll_interval_secs {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "thresholds.max_wait_secs={} is shorter than one poll interval ({}s)",
                    t.max_wait_secs, t.poll_interval_secs
                ),
            });
        }

        if t.replication_lag_secs <= 0.0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "thresholds.replication_lag_secs must be positive".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
