use anyhow::Context;
use clap::Args;
use dr_core::DrConfig;
use std::path::Path;

/// Per-field overrides layered on top of the config file. Each one can also
/// come from the environment the process was started with.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Environment tag used in notifications
    #[arg(long, global = true, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    #[arg(long, global = true, env = "PRIMARY_REGION")]
    pub primary_region: Option<String>,

    #[arg(long, global = true, env = "DR_REGION")]
    pub dr_region: Option<String>,

    #[arg(long, global = true, env = "CLUSTER_NAME")]
    pub cluster_name: Option<String>,

    /// Identifier of the primary database instance
    #[arg(long, global = true, env = "DB_IDENTIFIER")]
    pub db_identifier: Option<String>,

    /// Topic that receives operator notifications
    #[arg(long, global = true, env = "SNS_TOPIC_ARN")]
    pub notification_topic: Option<String>,

    /// Base URL of the control-plane gateway
    #[arg(long, global = true, env = "DR_GATEWAY_URL")]
    pub gateway_url: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut DrConfig) {
        if let Some(v) = &self.environment {
            config.environment = v.clone();
        }
        if let Some(v) = &self.primary_region {
            config.primary_region = v.clone();
        }
        if let Some(v) = &self.dr_region {
            config.dr_region = v.clone();
        }
        if let Some(v) = &self.cluster_name {
            config.cluster_name = v.clone();
        }
        if let Some(v) = &self.db_identifier {
            config.db_identifier = v.clone();
        }
        if let Some(v) = &self.notification_topic {
            config.notification_topic = Some(v.clone());
        }
        if let Some(v) = &self.gateway_url {
            config.gateway_url = Some(v.clone());
        }
    }
}

/// Load the config file at `path` and apply `overrides` on top.
pub fn resolve_config(path: &Path, overrides: &Overrides) -> anyhow::Result<DrConfig> {
    let mut config = DrConfig::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    overrides.apply(&mut config);
    Ok(config)
}
