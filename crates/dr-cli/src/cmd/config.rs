use crate::output::print_json;
use clap::Subcommand;
use dr_core::config::WarnLevel;
use dr_core::DrConfig;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the config after file and environment overrides are applied
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config: &DrConfig, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config, json),
        ConfigSubcommand::Validate => validate(config, json),
    }
}

fn show(config: &DrConfig, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(config)
    } else {
        print!("{}", config.to_yaml()?);
        Ok(())
    }
}

fn validate(config: &DrConfig, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
