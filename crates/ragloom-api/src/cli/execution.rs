//! CLI execution inspection: record status, final output and chat transcript.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{presets, Cell, ContentArrangement, Table};
use console::style;

use ragloom_types::chat::ChatRole;

use super::{format_status, parse_id};
use crate::state::AppState;

#[derive(Subcommand)]
pub enum ExecutionCommand {
    /// Show an execution's status, log and final output.
    Show {
        /// Execution UUID.
        id: String,
    },
}

pub async fn handle_execution_command(
    cmd: ExecutionCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    match cmd {
        ExecutionCommand::Show { id } => show_execution(state, &id, json).await,
    }
}

async fn show_execution(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id, "execution")?;
    let record = state
        .execution_service
        .get(&id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load execution: {e}"))?
        .ok_or_else(|| anyhow::anyhow!("Execution {id} not found"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![Cell::new("Execution"), Cell::new(record.id)]);
    table.add_row(vec![Cell::new("Workflow"), Cell::new(record.workflow_id)]);
    table.add_row(vec![Cell::new("Status"), format_status(record.status)]);
    table.add_row(vec![
        Cell::new("Started"),
        Cell::new(record.started_at.format("%Y-%m-%d %H:%M:%S").to_string()),
    ]);
    if let Some(completed) = record.completed_at {
        table.add_row(vec![
            Cell::new("Completed"),
            Cell::new(completed.format("%Y-%m-%d %H:%M:%S").to_string()),
        ]);
    }
    table.add_row(vec![Cell::new("Input"), Cell::new(record.input_data.to_string())]);
    if let Some(log) = &record.log {
        table.add_row(vec![Cell::new("Log"), Cell::new(log)]);
    }

    println!();
    println!("{table}");

    if let Some(output) = record.output_data.as_ref().and_then(|v| v.as_object()) {
        for (node_id, value) in output {
            println!();
            println!("  {} {}", style("Output").bold(), style(node_id).dim());
            let text = value
                .get("response")
                .or_else(|| value.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            for line in text.lines() {
                println!("  {line}");
            }
        }
    }
    println!();

    Ok(())
}

pub async fn show_chat(state: &AppState, execution_id: &str, json: bool) -> Result<()> {
    let id = parse_id(execution_id, "execution")?;
    let entries = state
        .execution_service
        .chat(&id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load chat history: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        println!("  No chat entries for execution {id}.");
        println!();
        return Ok(());
    }

    println!();
    for entry in &entries {
        let who = match entry.role {
            ChatRole::User => style("you").cyan().bold(),
            ChatRole::Assistant => style("assistant").green().bold(),
        };
        println!(
            "  {} {}",
            who,
            style(entry.timestamp.format("%H:%M:%S").to_string()).dim()
        );
        for line in entry.content.lines() {
            println!("  {line}");
        }
        println!();
    }

    Ok(())
}
