//! Execution tracking types.
//!
//! An `ExecutionRecord` is created `Pending`, moves to `Running` when the
//! orchestrator picks it up and ends `Completed` or `Failed` exactly once.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InvalidTransition;

/// Status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ExecutionStatus::Pending),
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!("invalid execution status: '{other}'")),
        }
    }
}

/// One run of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// UUIDv7 execution ID.
    pub id: Uuid,
    /// Workflow the execution runs.
    pub workflow_id: Uuid,
    /// Top-level input payload, e.g. `{"query": "hello"}`.
    pub input_data: serde_json::Value,
    pub status: ExecutionStatus,
    /// Map from output node id to that node's serialized output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<serde_json::Value>,
    /// Summary line or fault message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// A fresh `Pending` record for `workflow_id`.
    pub fn new(workflow_id: Uuid, input_data: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_id,
            input_data,
            status: ExecutionStatus::Pending,
            output_data: None,
            log: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// `Pending -> Running`.
    pub fn begin(&mut self) -> Result<(), InvalidTransition> {
        self.transition(ExecutionStatus::Running)?;
        self.started_at = Utc::now();
        Ok(())
    }

    /// `Running -> Completed`, storing the final output and summary.
    pub fn complete(
        &mut self,
        output_data: serde_json::Value,
        log: impl Into<String>,
    ) -> Result<(), InvalidTransition> {
        self.transition(ExecutionStatus::Completed)?;
        self.output_data = Some(output_data);
        self.log = Some(log.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `Pending | Running -> Failed`, storing the fault message as the log.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), InvalidTransition> {
        self.transition(ExecutionStatus::Failed)?;
        self.log = Some(message.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, to: ExecutionStatus) -> Result<(), InvalidTransition> {
        let allowed = matches!(
            (self.status, to),
            (ExecutionStatus::Pending, ExecutionStatus::Running)
                | (ExecutionStatus::Running, ExecutionStatus::Completed)
                | (ExecutionStatus::Pending, ExecutionStatus::Failed)
                | (ExecutionStatus::Running, ExecutionStatus::Failed)
        );
        if !allowed {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
