//! Confpush CLI - run the push engine against a simulated peer
//!
//! Usage:
//!   confpush simulate --scenario conflict-then-success
//!   confpush simulate --scenario missing-capability --max-wait-ms 500
//!   confpush config --config push.json

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use confpush_core::{ConfigPusher, FailureReporter, LoggingReporter, PushConfig, PushError, PushEvent, PushWorker};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod scenario;
mod ui;

use scenario::Scenario;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push snapshots to a simulated peer and print every outcome
    Simulate(SimulateArgs),

    /// Print the effective push configuration as JSON
    Config(ConfigArgs),
}

#[derive(ClapArgs, Debug)]
struct ConfigArgs {
    /// JSON push configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capability wait deadline in milliseconds
    #[arg(long)]
    max_wait_ms: Option<u64>,

    /// Conflict recovery deadline in milliseconds
    #[arg(long)]
    conflict_timeout_ms: Option<u64>,

    /// Capability poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Pause before retrying after a conflict, in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,
}

#[derive(ClapArgs, Debug)]
struct SimulateArgs {
    /// Peer behaviour to simulate
    #[arg(short, long, value_enum, default_value_t = Scenario::Success)]
    scenario: Scenario,

    /// Number of snapshots to queue
    #[arg(short = 'n', long, default_value_t = 1)]
    snapshots: u64,

    #[command(flatten)]
    config: ConfigArgs,
}

/// Logs every failure and keeps its message for the summary
#[derive(Default)]
struct ConsoleReporter {
    log: LoggingReporter,
    messages: Mutex<Vec<String>>,
}

impl ConsoleReporter {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl FailureReporter for ConsoleReporter {
    fn report(&self, message: &str, cause: &PushError) {
        self.log.report(message, cause);
        self.messages.lock().push(message.to_string());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Simulate(sim) => simulate(sim).await,
        Command::Config(config) => {
            let config = load_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<PushConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            PushConfig::from_json(&json)?
        }
        None => PushConfig::default(),
    };

    if let Some(ms) = args.max_wait_ms {
        config.max_wait_for_capabilities_ms = ms;
    }
    if let Some(ms) = args.conflict_timeout_ms {
        config.conflicting_version_timeout_ms = ms;
    }
    if let Some(ms) = args.poll_interval_ms {
        config.capability_poll_interval_ms = ms;
    }
    if let Some(ms) = args.retry_delay_ms {
        config.conflict_retry_delay_ms = ms;
    }

    config.validate()?;
    Ok(config)
}

async fn simulate(args: SimulateArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    ui::print_banner(args.scenario, &config);

    let reporter = Arc::new(ConsoleReporter::default());
    let sessions = Arc::new(args.scenario.session_source());
    let pusher = ConfigPusher::new(config, sessions, reporter.clone())?;
    let (handle, mut events) = PushWorker::spawn(pusher);

    handle.push_configs(args.scenario.snapshots(args.snapshots))?;
    info!(snapshots = args.snapshots, "Queued config snapshots");

    let mut completed = 0;
    let mut fatal = false;
    while completed < args.snapshots {
        let Some(event) = events.recv().await else {
            break;
        };
        ui::print_event(&event);
        match event {
            PushEvent::Completed { outcome, .. } => {
                completed += 1;
                fatal |= outcome.is_fatal();
            }
            PushEvent::Halted { .. } => break,
        }
    }

    handle.shutdown().await?;
    ui::print_summary(&reporter.messages());

    if fatal {
        std::process::exit(1);
    }
    Ok(())
}
