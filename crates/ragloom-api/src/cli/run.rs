//! `ragloom run`: create an execution for a workflow and drive it to completion.

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use serde_json::Value;

use ragloom_core::workflow::orchestrator::ExecutionOutcome;
use ragloom_types::workflow::NodeOutput;

use super::parse_id;
use crate::state::AppState;

/// Build the execution input from `--query` or `--input`.
pub fn build_input(query: Option<String>, input: Option<String>) -> Result<Value> {
    if let Some(raw) = input {
        let value: Value = serde_json::from_str(&raw).context("Invalid JSON for --input")?;
        if !value.is_object() {
            anyhow::bail!("--input must be a JSON object");
        }
        return Ok(value);
    }
    Ok(match query {
        Some(q) => serde_json::json!({ "query": q }),
        None => serde_json::json!({}),
    })
}

pub async fn run_workflow(
    state: &AppState,
    workflow_id: &str,
    query: Option<String>,
    input: Option<String>,
    json: bool,
) -> Result<()> {
    let workflow_id = parse_id(workflow_id, "workflow")?;
    let input = build_input(query, input)?;

    let def = state
        .workflow_service
        .get(&workflow_id)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    // Create first so the ID can be reported even when the run fails.
    let record = state
        .execution_service
        .create(workflow_id, input)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create execution: {e}"))?;

    if !json {
        println!();
        println!(
            "  {} Running '{}' (execution {})",
            style(">").cyan().bold(),
            style(&def.name).cyan(),
            record.id
        );
    }

    let outcome = state
        .execution_service
        .run_existing(record.id)
        .await
        .map_err(|e| anyhow::anyhow!("Execution {} failed: {e}", record.id))?;

    if json {
        let out = serde_json::json!({
            "execution": outcome.record,
            "node_outputs": outcome.node_outputs,
            "processed": outcome.processed,
            "unreached": outcome.unreached,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &ExecutionOutcome) {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Node").fg(Color::Cyan),
            Cell::new("Result"),
        ]);
    for id in &outcome.processed {
        let cell = match outcome.node_outputs.get(id) {
            Some(NodeOutput::Error { error }) => Cell::new(format!("error: {error}")).fg(Color::Red),
            Some(output) => Cell::new(output.type_tag()).fg(Color::Green),
            None => Cell::new("-"),
        };
        table.add_row(vec![Cell::new(id), cell]);
    }
    println!();
    println!("{table}");

    for id in &outcome.processed {
        if let Some(NodeOutput::Output { response, sources }) = outcome.node_outputs.get(id) {
            println!();
            println!("  {} {}", style("Output").bold(), style(id).dim());
            println!();
            for line in response.lines() {
                println!("  {line}");
            }
            if !sources.is_empty() {
                println!();
                println!("  {}", style("Sources:").bold());
                for source in sources {
                    println!("  - {}", style(source).dim());
                }
            }
        }
    }

    println!();
    if outcome.stalled() {
        println!(
            "  {} stalled before reaching: {}",
            style("Warning:").yellow().bold(),
            outcome.unreached.join(", ")
        );
    }
    if let Some(log) = &outcome.record.log {
        println!("  {}", style(log).dim());
    }
    println!();
}
