use super::Wiring;
use crate::output::print_json;
use anyhow::Context;
use dr_core::DrConfig;
use std::io::Read;

/// Handle one raw invocation event. The `{statusCode, body}` envelope is
/// always printed; a non-200 status also fails the process.
pub fn run(config: DrConfig, event: &str) -> anyhow::Result<()> {
    let raw = if event == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read event from stdin")?;
        buf
    } else {
        event.to_string()
    };
    let event: serde_json::Value =
        serde_json::from_str(&raw).context("event is not valid JSON")?;

    let wiring = Wiring::connect(&config)?;
    let response = wiring.orchestrator(config).handle_event(&event);
    print_json(&response)?;

    if response.status_code != 200 {
        anyhow::bail!("invocation returned status {}", response.status_code);
    }
    Ok(())
}
