pub mod config;
pub mod invoke;
pub mod procedure;

use anyhow::Context;
use dr_core::collaborators::SystemClock;
use dr_core::gateway::{GatewayClient, GatewayDatabase, GatewayNotifier};
use dr_core::{Collaborators, DrConfig, Orchestrator};

/// HTTP collaborators for one invocation, built from the resolved config.
pub struct Wiring {
    gateway: GatewayClient,
    primary: GatewayDatabase,
    replica: GatewayDatabase,
    notifier: GatewayNotifier,
    clock: SystemClock,
}

impl Wiring {
    pub fn connect(config: &DrConfig) -> anyhow::Result<Self> {
        config
            .ensure_runnable()
            .context("configuration is incomplete")?;
        let url = config
            .gateway_url
            .as_deref()
            .context("gateway_url is not set (use --gateway-url or DR_GATEWAY_URL)")?;
        let gateway = GatewayClient::new(url).context("failed to build gateway client")?;
        Ok(Self {
            primary: gateway.database(config.primary_region.clone()),
            replica: gateway.database(config.dr_region.clone()),
            notifier: gateway.notifier(config.notification_topic.clone()),
            gateway,
            clock: SystemClock,
        })
    }

    pub fn orchestrator(&self, config: DrConfig) -> Orchestrator<'_> {
        Orchestrator::new(
            config,
            Collaborators {
                primary: &self.primary,
                replica: &self.replica,
                metrics: &self.gateway,
                dns: &self.gateway,
                notifier: &self.notifier,
                clock: &self.clock,
            },
        )
    }
}
