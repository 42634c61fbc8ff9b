//! Batch command handlers
//!
//! Submits many documents to one pipeline and follows the batch's
//! per-document progress.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use docket_core::domain::{BatchProgress, ExecutionStatus, TrackedBatch};
use docket_tracker::{BatchTracker, PollOutcome};
use std::sync::Arc;

use crate::config::Config;
use crate::console::{ConsoleNotifier, colorize_status, watch};

/// Batch subcommands
#[derive(Subcommand)]
pub enum BatchCommands {
    /// Submit several documents to one pipeline
    Submit {
        /// Pipeline configuration ID
        #[arg(short, long)]
        pipeline: String,

        /// Document IDs
        #[arg(required = true, num_args = 1..)]
        documents: Vec<String>,

        /// Follow the batch until it finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// Show the current status of a batch
    Status {
        /// Batch ID
        id: String,
    },
    /// Follow a batch until it finishes
    Watch {
        /// Batch ID
        id: String,
    },
    /// Cancel a running batch
    Cancel {
        /// Batch ID
        id: String,
    },
}

/// Handle batch commands
pub async fn handle_batch_command(command: BatchCommands, config: &Config) -> Result<()> {
    let tracker = Arc::new(BatchTracker::new(
        config.client(),
        Arc::new(ConsoleNotifier),
        &config.tracker,
    ));

    match command {
        BatchCommands::Submit {
            pipeline,
            documents,
            watch,
        } => {
            let tracked = tracker.process_batch(&pipeline, &documents).await?;
            println!("  Batch ID: {}", tracked.id().cyan());
            println!("  Status:   {}", colorize_status(tracked.batch.status));
            if watch && !tracked.batch.status.is_terminal() {
                watch_batch(tracker, config, tracked.id()).await?;
            }
            Ok(())
        }
        BatchCommands::Status { id } => {
            let tracked = tracker.get_batch_status(&id).await?;
            print_batch_details(&tracked);
            Ok(())
        }
        BatchCommands::Watch { id } => watch_batch(tracker, config, &id).await,
        BatchCommands::Cancel { id } => {
            let tracked = tracker.cancel_batch(&id).await?;
            print_batch_details(&tracked);
            Ok(())
        }
    }
}

/// Follow a batch and print its document counts as they change
async fn watch_batch(tracker: Arc<BatchTracker>, config: &Config, id: &str) -> Result<()> {
    println!("{}", format!("Watching batch {}...", id).bold());

    let mut last = None;
    let outcome = watch(tracker, &config.tracker, id, |tracked: &TrackedBatch| {
        let seen = (tracked.batch.status, tracked.progress.clone());
        if last != Some(seen.clone()) {
            last = Some(seen);
            println!(
                "  {} {}",
                format_counts(&tracked.progress, tracked.batch.total_documents),
                colorize_status(tracked.batch.status)
            );
        }
    })
    .await?;

    match outcome {
        None => Ok(()),
        Some(PollOutcome::Terminal(tracked)) => {
            println!();
            print_batch_details(&tracked);
            if tracked.batch.status == ExecutionStatus::Failed {
                bail!("Batch {} failed", tracked.id());
            }
            Ok(())
        }
        Some(PollOutcome::Failed(err)) => {
            Err(err).with_context(|| format!("Stopped watching batch {}", id))
        }
        Some(PollOutcome::Stalled(snapshot)) => {
            let counts = snapshot
                .map(|t| format_counts(&t.progress, t.batch.total_documents))
                .unwrap_or_default();
            bail!("Batch {} is still running after the polling deadline {}", id, counts)
        }
        Some(PollOutcome::Cleared(_)) => {
            println!("{}", "Polling for this batch was cleared.".yellow());
            Ok(())
        }
    }
}

fn format_counts(progress: &BatchProgress, total: usize) -> String {
    format!(
        "{} done, {} failed, {} in progress (of {})",
        progress.success.len().to_string().green(),
        progress.failed.len().to_string().red(),
        progress.in_progress.len().to_string().cyan(),
        total
    )
}

/// Print detailed batch information
fn print_batch_details(tracked: &TrackedBatch) {
    let batch = &tracked.batch;

    println!("{}", "Batch Details:".bold());
    println!("  ID:          {}", batch.id.cyan());
    println!("  Status:      {}", colorize_status(batch.status));
    if let Some(pipeline_id) = &batch.pipeline_id {
        println!("  Pipeline:    {}", pipeline_id.dimmed());
    }
    println!(
        "  Documents:   {}",
        format_counts(&tracked.progress, batch.total_documents)
    );

    if let Some(created) = batch.created_at {
        println!("  Created:     {}", created.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(completed) = batch.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }

    if !batch.documents.is_empty() {
        println!("\n{}", "Documents:".bold());
        for document in &batch.documents {
            println!(
                "  {} {} {}",
                "▸".cyan(),
                document.document_id,
                colorize_status(document.status)
            );
            if let Some(execution_id) = &document.execution_id {
                println!("    Execution: {}", execution_id.dimmed());
            }
            if let Some(error) = &document.error_message {
                println!("    Error:     {}", error.red());
            }
        }
    }
}
