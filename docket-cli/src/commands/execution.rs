//! Execution command handlers
//!
//! Submits single documents and follows, cancels or retries the resulting
//! executions.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use docket_core::domain::{Execution, ExecutionStatus};
use docket_tracker::{ExecutionTracker, PollOutcome};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::console::{ConsoleNotifier, colorize_status, progress_bar, watch};

/// Execution subcommands
#[derive(Subcommand)]
pub enum ExecCommands {
    /// Submit a document for processing
    Submit {
        /// Document ID
        document_id: String,

        /// Pipeline configuration ID
        #[arg(short, long)]
        pipeline: String,

        /// Parameters as key=value pairs; values are parsed as JSON when possible
        #[arg(long, value_parser = parse_key_val)]
        param: Vec<(String, String)>,

        /// Wait for the service to finish before it responds
        #[arg(long)]
        sync: bool,

        /// Follow the execution until it finishes
        #[arg(short, long)]
        watch: bool,
    },
    /// Show the current status of an execution
    Status {
        /// Execution ID
        id: String,
    },
    /// Follow an execution until it finishes
    Watch {
        /// Execution ID
        id: String,
    },
    /// Cancel a running execution
    Cancel {
        /// Execution ID
        id: String,
    },
    /// Run a finished execution again
    Retry {
        /// Execution ID
        id: String,

        /// Follow the execution until it finishes
        #[arg(short, long)]
        watch: bool,
    },
}

/// Parse a single key=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn parse_param_value(raw: String) -> JsonValue {
    serde_json::from_str(&raw).unwrap_or(JsonValue::String(raw))
}

/// Handle execution commands
pub async fn handle_exec_command(command: ExecCommands, config: &Config) -> Result<()> {
    let tracker = Arc::new(ExecutionTracker::new(
        config.client(),
        Arc::new(ConsoleNotifier),
        &config.tracker,
    ));

    match command {
        ExecCommands::Submit {
            document_id,
            pipeline,
            param,
            sync,
            watch,
        } => {
            let execution = submit(&tracker, &document_id, &pipeline, param, !sync).await?;
            if watch && !execution.status.is_terminal() {
                watch_execution(tracker, config, &execution.id).await?;
            }
            Ok(())
        }
        ExecCommands::Status { id } => {
            let execution = tracker.get_execution_status(&id).await?;
            print_execution_details(&execution);
            Ok(())
        }
        ExecCommands::Watch { id } => watch_execution(tracker, config, &id).await,
        ExecCommands::Cancel { id } => {
            let execution = tracker.cancel_execution(&id).await?;
            print_execution_details(&execution);
            Ok(())
        }
        ExecCommands::Retry { id, watch } => {
            let execution = tracker.retry_execution(&id).await?;
            print_execution_details(&execution);
            if watch {
                watch_execution(tracker, config, &execution.id).await?;
            }
            Ok(())
        }
    }
}

/// Submit a document and print the new execution
async fn submit(
    tracker: &ExecutionTracker,
    document_id: &str,
    pipeline_id: &str,
    params: Vec<(String, String)>,
    run_async: bool,
) -> Result<Arc<Execution>> {
    let parameters: Option<HashMap<String, JsonValue>> = if params.is_empty() {
        None
    } else {
        Some(
            params
                .into_iter()
                .map(|(k, v)| (k, parse_param_value(v)))
                .collect(),
        )
    };

    let execution = tracker
        .process_pipeline(document_id, pipeline_id, run_async, parameters)
        .await?;

    println!("  Execution ID: {}", execution.id.cyan());
    println!("  Status:       {}", colorize_status(execution.status));

    Ok(execution)
}

/// Follow an execution and print its progress
async fn watch_execution(tracker: Arc<ExecutionTracker>, config: &Config, id: &str) -> Result<()> {
    println!("{}", format!("Watching execution {}...", id).bold());

    let mut last = None;
    let outcome = watch(tracker, &config.tracker, id, |execution: &Execution| {
        let seen = (execution.status, execution.progress);
        if last != Some(seen) {
            last = Some(seen);
            println!(
                "  {} {}",
                progress_bar(execution.progress),
                colorize_status(execution.status)
            );
        }
    })
    .await?;

    match outcome {
        None => Ok(()),
        Some(PollOutcome::Terminal(execution)) => {
            println!();
            print_execution_details(&execution);
            if execution.status == ExecutionStatus::Failed {
                bail!("Execution {} failed", execution.id);
            }
            Ok(())
        }
        Some(PollOutcome::Failed(err)) => {
            Err(err).with_context(|| format!("Stopped watching execution {}", id))
        }
        Some(PollOutcome::Stalled(snapshot)) => {
            let status = snapshot
                .map(|e| e.status.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            bail!(
                "Execution {} is still {} after the polling deadline",
                id,
                status
            )
        }
        Some(PollOutcome::Cleared(_)) => {
            println!("{}", "Execution was restarted; watch it again to follow the new run.".yellow());
            Ok(())
        }
    }
}

/// Print detailed execution information
fn print_execution_details(execution: &Execution) {
    println!("{}", "Execution Details:".bold());
    println!("  ID:          {}", execution.id.cyan());
    println!("  Status:      {}", colorize_status(execution.status));
    println!("  Progress:    {}", progress_bar(execution.progress));
    if !execution.document_id.is_empty() {
        println!("  Document:    {}", execution.document_id.dimmed());
    }
    match &execution.pipeline_name {
        Some(name) => println!("  Pipeline:    {} ({})", name, execution.pipeline_id.dimmed()),
        None if !execution.pipeline_id.is_empty() => {
            println!("  Pipeline:    {}", execution.pipeline_id.dimmed())
        }
        None => {}
    }

    if let Some(started) = execution.started_at {
        println!("  Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(completed) = execution.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));

        if let Some(started) = execution.started_at {
            let duration = completed.signed_duration_since(started);
            println!("  Duration:    {}s", duration.num_seconds());
        }
    }

    if let Some(error) = &execution.error_message {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }

    if let Some(result) = &execution.result {
        println!("\n{}", "Result:".bold());
        match serde_json::to_string_pretty(result) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{:?}", result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val_splits_on_first_equals() {
        assert_eq!(
            parse_key_val("query=a=b").unwrap(),
            ("query".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
    }

    #[test]
    fn test_param_values_prefer_json() {
        assert_eq!(parse_param_value("3".into()), JsonValue::from(3));
        assert_eq!(parse_param_value("true".into()), JsonValue::Bool(true));
        assert_eq!(
            parse_param_value("en-US".into()),
            JsonValue::String("en-US".into())
        );
    }
}
