//! Docket CLI
//!
//! Command-line interface for submitting documents to the pipeline service
//! and following executions and batches until they finish.

mod commands;
mod config;
mod console;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use docket_tracker::TrackerConfig;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docket")]
#[command(about = "Docket document pipeline CLI", long_about = None)]
struct Cli {
    /// Pipeline service URL
    #[arg(long, env = "DOCKET_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Bearer token for the pipeline service
    #[arg(long, env = "DOCKET_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Interval between status polls, in milliseconds
    #[arg(long, env = "DOCKET_POLL_INTERVAL_MS", default_value = "2000")]
    poll_interval_ms: u64,

    /// Stop watching a job that is still running after this many seconds
    #[arg(long, env = "DOCKET_MAX_POLL_DURATION_SECS")]
    max_poll_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docket=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Flags win over the remaining DOCKET_* tunables read from the environment
    let mut tracker = TrackerConfig::new(cli.api_url)
        .with_env_overrides()
        .with_poll_interval(Duration::from_millis(cli.poll_interval_ms));
    if let Some(secs) = cli.max_poll_secs {
        tracker = tracker.with_max_poll_duration(Duration::from_secs(secs));
    }
    tracker.validate()?;
    tracing::debug!(api_url = %tracker.api_url, poll_interval = ?tracker.poll_interval, "Resolved configuration");

    let config = Config {
        tracker,
        token: cli.token,
    };

    handle_command(cli.command, &config).await
}
