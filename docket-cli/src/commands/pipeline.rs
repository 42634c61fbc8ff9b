//! Pipeline configuration command handlers
//!
//! Lists, inspects, creates, updates and deletes pipeline configurations
//! through the config cache.

use anyhow::{Context, Result, ensure};
use clap::Subcommand;
use colored::*;
use docket_core::domain::{PipelineConfig, PipelineStep};
use docket_core::dto::pipeline::PipelineConfigDraft;
use docket_tracker::ConfigCache;
use std::sync::Arc;

use crate::config::Config;
use crate::console::ConsoleNotifier;

/// Pipeline configuration subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// List pipeline configurations
    List {
        /// Only show pipelines that accept this document type
        #[arg(short = 't', long)]
        document_type: Option<String>,
    },
    /// Get pipeline configuration details
    Get {
        /// Pipeline configuration ID
        id: String,
    },
    /// Create a pipeline configuration
    Create {
        /// Pipeline name
        #[arg(short, long)]
        name: String,

        /// Document type the pipeline accepts
        #[arg(short = 't', long = "type")]
        pipeline_type: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Path to a JSON file holding the ordered step list
        #[arg(short, long)]
        steps: Option<String>,
    },
    /// Update a pipeline configuration
    Update {
        /// Pipeline configuration ID
        id: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New document type
        #[arg(short = 't', long = "type")]
        pipeline_type: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// Path to a JSON file holding the new step list
        #[arg(short, long)]
        steps: Option<String>,
    },
    /// Delete a pipeline configuration
    Delete {
        /// Pipeline configuration ID
        id: String,
    },
}

/// Handle pipeline configuration commands
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    ensure!(
        config.token.is_some(),
        "Not signed in: pass --token or set DOCKET_TOKEN"
    );

    let cache = ConfigCache::new(
        config.client(),
        Arc::new(config.session()),
        Arc::new(ConsoleNotifier),
        &config.tracker,
    );

    match command {
        PipelineCommands::List { document_type } => {
            list_configs(&cache, document_type.as_deref()).await
        }
        PipelineCommands::Get { id } => get_config(&cache, &id).await,
        PipelineCommands::Create {
            name,
            pipeline_type,
            description,
            steps,
        } => {
            let steps = match steps {
                Some(path) => read_steps(&path)?,
                None => Vec::new(),
            };
            let draft = PipelineConfigDraft {
                name,
                pipeline_type,
                description,
                steps,
            };
            let created = cache.create(draft).await?;
            print_config_details(&created);
            Ok(())
        }
        PipelineCommands::Update {
            id,
            name,
            pipeline_type,
            description,
            steps,
        } => {
            let current = find_config(&cache, &id).await?;
            let mut draft = PipelineConfigDraft::from(&current);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(pipeline_type) = pipeline_type {
                draft.pipeline_type = pipeline_type;
            }
            if description.is_some() {
                draft.description = description;
            }
            if let Some(path) = steps {
                draft.steps = read_steps(&path)?;
            }

            let updated = cache.update(&id, draft).await?;
            print_config_details(&updated);
            Ok(())
        }
        PipelineCommands::Delete { id } => {
            cache.delete(&id).await?;
            Ok(())
        }
    }
}

/// List all configs, optionally only those accepting `document_type`
async fn list_configs(cache: &ConfigCache, document_type: Option<&str>) -> Result<()> {
    let all = cache.ensure_loaded().await?;
    let configs = match document_type {
        Some(document_type) => cache.compatible(document_type),
        None => all.as_ref().clone(),
    };

    if configs.is_empty() {
        println!("{}", "No pipeline configurations found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} pipeline configuration(s):", configs.len()).bold()
        );
        println!();
        for config in &configs {
            print_config_summary(config);
        }
    }

    Ok(())
}

async fn get_config(cache: &ConfigCache, id: &str) -> Result<()> {
    let config = find_config(cache, id).await?;
    print_config_details(&config);
    Ok(())
}

async fn find_config(cache: &ConfigCache, id: &str) -> Result<PipelineConfig> {
    cache.ensure_loaded().await?;
    cache
        .get(id)
        .with_context(|| format!("Pipeline configuration {} not found", id))
}

fn read_steps(path: &str) -> Result<Vec<PipelineStep>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read steps file: {}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse steps from {}", path))
}

/// Print a pipeline configuration summary
fn print_config_summary(config: &PipelineConfig) {
    println!("  {} {}", "▸".cyan(), config.name.bold());
    println!("    ID:    {}", config.id.dimmed());
    println!("    Type:  {}", config.pipeline_type);
    println!("    Steps: {}", config.steps.len().to_string().dimmed());
    if let Some(desc) = &config.description {
        println!("    Description: {}", desc.dimmed());
    }
    println!();
}

/// Print detailed pipeline configuration information
fn print_config_details(config: &PipelineConfig) {
    println!("{}", "Pipeline Configuration:".bold());
    println!("  ID:          {}", config.id.cyan());
    println!("  Name:        {}", config.name.bold());
    println!("  Type:        {}", config.pipeline_type);
    if let Some(desc) = &config.description {
        println!("  Description: {}", desc);
    }
    if let Some(created) = config.created_at {
        println!("  Created:     {}", created.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(updated) = config.updated_at {
        println!("  Updated:     {}", updated.format("%Y-%m-%d %H:%M:%S"));
    }

    if !config.steps.is_empty() {
        println!("\n{}", "Steps:".bold());
        for (index, step) in config.steps.iter().enumerate() {
            println!(
                "  {}. {} {}",
                index + 1,
                step.name.cyan(),
                format!("({})", step.step_type).dimmed()
            );
        }
    }
}
