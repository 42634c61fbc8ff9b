//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod batch;
mod execution;
mod pipeline;

pub use batch::BatchCommands;
pub use execution::ExecCommands;
pub use pipeline::PipelineCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Single-document executions
    Exec {
        #[command(subcommand)]
        command: ExecCommands,
    },
    /// Multi-document batches
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },
    /// Pipeline configurations
    Config {
        #[command(subcommand)]
        command: PipelineCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Exec { command } => execution::handle_exec_command(command, config).await,
        Commands::Batch { command } => batch::handle_batch_command(command, config).await,
        Commands::Config { command } => pipeline::handle_pipeline_command(command, config).await,
    }
}
