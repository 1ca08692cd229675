//! CLI workflow management subcommands.
//!
//! Provides import, list, show, delete, and validate operations for
//! workflow definitions. Workflows are imported from JSON files in the
//! canvas format: `{"name", "description", "nodes": [...], "edges": [...]}`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use ragloom_core::service::workflow::{plan_workflow, WorkflowPlan};
use ragloom_core::workflow::graph::GraphError;
use ragloom_types::workflow::{WorkflowDefinition, WorkflowDraft};

use super::parse_id;
use crate::state::AppState;

/// Workflow management subcommands.
#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// Import a workflow from a JSON file.
    Import {
        /// Path to the workflow JSON file.
        file: PathBuf,

        /// Override the name stored in the file.
        #[arg(long)]
        name: Option<String>,
    },

    /// List saved workflows.
    List,

    /// Show a workflow's nodes and edges.
    Show {
        /// Workflow UUID.
        id: String,
    },

    /// Delete a saved workflow.
    Delete {
        /// Workflow UUID.
        id: String,
    },

    /// Check a workflow graph and preview its processing order.
    Validate {
        /// Workflow UUID (omit when using --file).
        #[arg(required_unless_present = "file")]
        id: Option<String>,

        /// Validate a JSON file without saving it.
        #[arg(long, conflicts_with = "id")]
        file: Option<PathBuf>,
    },
}

/// Handle a workflow subcommand.
pub async fn handle_workflow_command(
    cmd: WorkflowCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    match cmd {
        WorkflowCommand::Import { file, name } => handle_import(&file, name, state, json).await,
        WorkflowCommand::List => handle_list(state, json).await,
        WorkflowCommand::Show { id } => handle_show(&id, state, json).await,
        WorkflowCommand::Delete { id } => handle_delete(&id, state, json).await,
        WorkflowCommand::Validate { id, file } => {
            handle_validate(id.as_deref(), file.as_deref(), state, json).await
        }
    }
}

async fn read_draft(file: &Path) -> Result<WorkflowDraft> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid workflow JSON in {}", file.display()))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

async fn handle_import(
    file: &Path,
    name: Option<String>,
    state: &AppState,
    json: bool,
) -> Result<()> {
    let mut draft = read_draft(file).await?;
    if let Some(name) = name {
        draft.name = name;
    }

    let def = state
        .workflow_service
        .create(draft)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save workflow: {e}"))?;

    // Saved permissively; surface graph problems right away.
    let plan = plan_workflow(&def.nodes, &def.edges);

    if json {
        let out = serde_json::json!({
            "id": def.id.to_string(),
            "name": def.name,
            "nodes": def.nodes.len(),
            "edges": def.edges.len(),
            "valid": plan.is_ok(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Imported workflow '{}'",
            style("*").green().bold(),
            style(&def.name).cyan()
        );
        println!("  ID: {}", def.id);
        println!("  Nodes: {}", def.nodes.len());
        println!("  Edges: {}", def.edges.len());
        if let Err(e) = plan {
            println!("  {} {}", style("Warning:").yellow().bold(), e);
        }
        println!();
        println!(
            "  Run it with: {}",
            style(format!("ragloom run {} --query \"...\"", def.id)).dim()
        );
        println!();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

async fn handle_list(state: &AppState, json: bool) -> Result<()> {
    let defs = state
        .workflow_service
        .list()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list workflows: {e}"))?;

    if json {
        let out: Vec<_> = defs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id.to_string(),
                    "name": d.name,
                    "nodes": d.nodes.len(),
                    "edges": d.edges.len(),
                    "updated_at": d.updated_at.to_rfc3339(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if defs.is_empty() {
        println!();
        println!("  No workflows saved.");
        println!(
            "  Import one with: {}",
            style("ragloom workflow import <file.json>").dim()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("Name"),
            Cell::new("Nodes"),
            Cell::new("Edges"),
            Cell::new("Updated"),
        ]);

    for d in &defs {
        table.add_row(vec![
            Cell::new(d.id),
            Cell::new(&d.name),
            Cell::new(d.nodes.len()),
            Cell::new(d.edges.len()),
            Cell::new(d.updated_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Show
// ---------------------------------------------------------------------------

async fn handle_show(id: &str, state: &AppState, json: bool) -> Result<()> {
    let id = parse_id(id, "workflow")?;
    let def = state
        .workflow_service
        .get(&id)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&def)?);
        return Ok(());
    }

    print_definition(&def);
    Ok(())
}

fn print_definition(def: &WorkflowDefinition) {
    println!();
    println!("  {} {}", style("Workflow:").bold(), style(&def.name).cyan());
    println!("  ID: {}", def.id);
    if let Some(desc) = def.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  Description: {desc}");
    }
    println!("  Created: {}", def.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated: {}", def.updated_at.format("%Y-%m-%d %H:%M:%S"));
    println!();

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Node").fg(Color::Cyan),
            Cell::new("Type"),
            Cell::new("Next"),
        ]);
    for node in &def.nodes {
        let next: Vec<&str> = def
            .edges
            .iter()
            .filter(|e| e.source == node.id)
            .map(|e| e.target.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(&node.id),
            Cell::new(&node.kind),
            Cell::new(next.join(", ")),
        ]);
    }
    println!("{table}");
    println!();
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

async fn handle_delete(id: &str, state: &AppState, json: bool) -> Result<()> {
    let id = parse_id(id, "workflow")?;
    state
        .workflow_service
        .delete(&id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete workflow: {e}"))?;

    if json {
        let out = serde_json::json!({ "deleted": id.to_string() });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!("  {} Deleted workflow {}", style("*").green().bold(), id);
        println!();
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

async fn handle_validate(
    id: Option<&str>,
    file: Option<&Path>,
    state: &AppState,
    json: bool,
) -> Result<()> {
    let (label, plan) = match (id, file) {
        (_, Some(file)) => {
            let draft = read_draft(file).await?;
            (draft.name.clone(), plan_workflow(&draft.nodes, &draft.edges))
        }
        (Some(id), None) => {
            let id = parse_id(id, "workflow")?;
            let def = state
                .workflow_service
                .get(&id)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            (def.name.clone(), plan_workflow(&def.nodes, &def.edges))
        }
        (None, None) => anyhow::bail!("Pass a workflow ID or --file"),
    };

    if json {
        let out = match &plan {
            Ok(plan) => serde_json::json!({ "valid": true, "plan": plan }),
            Err(e) => serde_json::json!({ "valid": false, "error": e.to_string() }),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_plan(&label, &plan);
    }

    if plan.is_err() {
        anyhow::bail!("workflow '{label}' is not valid");
    }
    Ok(())
}

fn print_plan(label: &str, plan: &Result<WorkflowPlan, GraphError>) {
    println!();
    match plan {
        Err(e) => {
            println!("  {} '{}': {}", style("Invalid").red().bold(), label, e);
        }
        Ok(plan) => {
            println!("  {} '{}'", style("Valid").green().bold(), style(label).cyan());
            println!("  Start nodes: {}", plan.start_nodes.join(", "));
            for (i, batch) in plan.batches.iter().enumerate() {
                println!("  Batch {}: {}", i + 1, batch.join(", "));
            }
            if !plan.unreached.is_empty() {
                println!(
                    "  {} never reached: {}",
                    style("Warning:").yellow().bold(),
                    plan.unreached.join(", ")
                );
            }
            if !plan.cyclic.is_empty() {
                println!("  Cycle through: {}", plan.cyclic.join(", "));
            }
        }
    }
    println!();
}
