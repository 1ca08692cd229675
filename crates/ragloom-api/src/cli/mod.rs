//! CLI command definitions and dispatch for the `ragloom` binary.
//!
//! Uses clap derive macros for argument parsing. Commands are grouped by
//! resource (`ragloom workflow list`, `ragloom document add`).

pub mod document;
pub mod execution;
pub mod run;
pub mod workflow;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use comfy_table::{Cell, Color};
use ragloom_observe::tracing_setup::LogFormat;
use ragloom_types::execution::ExecutionStatus;

/// Run retrieval-augmented LLM workflows.
#[derive(Parser)]
#[command(name = "ragloom", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format.
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub log_format: LogFormatArg,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Human,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Human => LogFormat::Human,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage workflow definitions (import, list, show, delete, validate).
    #[command(alias = "wf")]
    Workflow {
        #[command(subcommand)]
        action: workflow::WorkflowCommand,
    },

    /// Manage knowledge-base documents (add, list, show, embed, delete).
    #[command(alias = "doc")]
    Document {
        #[command(subcommand)]
        action: document::DocumentCommand,
    },

    /// Execute a workflow.
    Run {
        /// Workflow UUID.
        workflow_id: String,

        /// Query text; shorthand for `--input '{"query": "..."}'`.
        #[arg(long, short, conflicts_with = "input")]
        query: Option<String>,

        /// Raw JSON input object.
        #[arg(long)]
        input: Option<String>,
    },

    /// Inspect executions.
    Execution {
        #[command(subcommand)]
        action: execution::ExecutionCommand,
    },

    /// Show the chat transcript of an execution.
    Chat {
        /// Execution UUID.
        execution_id: String,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Parse a UUID argument with a readable error.
pub fn parse_id(raw: &str, what: &str) -> anyhow::Result<uuid::Uuid> {
    raw.parse()
        .map_err(|_| anyhow::anyhow!("Invalid {what} ID: '{raw}'"))
}

pub fn format_status(status: ExecutionStatus) -> Cell {
    match status {
        ExecutionStatus::Pending => Cell::new("pending").fg(Color::Yellow),
        ExecutionStatus::Running => Cell::new("running").fg(Color::Blue),
        ExecutionStatus::Completed => Cell::new("completed").fg(Color::Green),
        ExecutionStatus::Failed => Cell::new("failed").fg(Color::Red),
    }
}
