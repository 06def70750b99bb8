mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use dr_core::{Action, ActionRequest};
use settings::Overrides;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dr-automation",
    about = "Disaster-recovery automation: health checks, failover, failback and DR drills",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (YAML). Missing file means defaults plus overrides.
    #[arg(long, global = true, env = "DR_CONFIG", default_value = "dr.yaml")]
    config: PathBuf,

    #[command(flatten)]
    overrides: Overrides,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check primary, replica, replication lag and DNS health
    HealthCheck,

    /// Promote the DR replica and repoint DNS to the DR region
    Failover {
        /// Step already completed by an earlier partial run (repeatable)
        #[arg(long = "skip-step", value_name = "STEP")]
        skip_steps: Vec<String>,
    },

    /// Re-establish replication from the primary and repoint DNS back
    Failback {
        /// Step already completed by an earlier partial run (repeatable)
        #[arg(long = "skip-step", value_name = "STEP")]
        skip_steps: Vec<String>,
    },

    /// Run the non-destructive DR drill
    TestDr,

    /// Handle a raw invocation event and print `{statusCode, body}`
    Invoke {
        /// Event JSON, or `-` to read it from stdin
        #[arg(long, default_value = "-")]
        event: String,
    },

    /// Inspect the resolved configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Failover { .. } | Commands::Failback { .. } | Commands::Invoke { .. } => {
            tracing::Level::INFO
        }
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = settings::resolve_config(&cli.config, &cli.overrides).and_then(|config| {
        match cli.command {
            Commands::HealthCheck => {
                cmd::procedure::run(config, ActionRequest::new(Action::HealthCheck), cli.json)
            }
            Commands::Failover { skip_steps } => cmd::procedure::run(
                config,
                cmd::procedure::request(Action::Failover, &skip_steps)?,
                cli.json,
            ),
            Commands::Failback { skip_steps } => cmd::procedure::run(
                config,
                cmd::procedure::request(Action::Failback, &skip_steps)?,
                cli.json,
            ),
            Commands::TestDr => {
                cmd::procedure::run(config, ActionRequest::new(Action::TestDr), cli.json)
            }
            Commands::Invoke { event } => cmd::invoke::run(config, &event),
            Commands::Config { subcommand } => cmd::config::run(&config, subcommand, cli.json),
        }
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
