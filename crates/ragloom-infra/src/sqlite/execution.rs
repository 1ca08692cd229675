//! SQLite execution repository implementation.
//!
//! Implements `ExecutionRepository` from `ragloom-core`: execution records,
//! the append-only chat history, and workflow snapshot loading.

use ragloom_core::repository::execution::{ExecutionRepository, WorkflowSnapshot};
use ragloom_types::chat::{ChatEntry, ChatRole};
use ragloom_types::error::RepositoryError;
use ragloom_types::execution::{ExecutionRecord, ExecutionStatus};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::workflow::{parse_edges, parse_nodes};
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

/// SQLite-backed implementation of `ExecutionRepository`.
pub struct SqliteExecutionRepository {
    pool: DatabasePool,
}

impl SqliteExecutionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct ExecutionRow {
    id: String,
    workflow_id: String,
    input_data: String,
    status: String,
    output_data: Option<String>,
    log: Option<String>,
    started_at: String,
    completed_at: Option<String>,
}

impl ExecutionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            input_data: row.try_get("input_data")?,
            status: row.try_get("status")?,
            output_data: row.try_get("output_data")?,
            log: row.try_get("log")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    fn into_record(self) -> Result<ExecutionRecord, RepositoryError> {
        let status: ExecutionStatus = self
            .status
            .parse()
            .map_err(RepositoryError::Query)?;

        let input_data = serde_json::from_str(&self.input_data)
            .map_err(|e| RepositoryError::Query(format!("invalid input_data JSON: {e}")))?;
        let output_data = self
            .output_data
            .as_deref()
            .map(|s| {
                serde_json::from_str(s)
                    .map_err(|e| RepositoryError::Query(format!("invalid output_data JSON: {e}")))
            })
            .transpose()?;

        Ok(ExecutionRecord {
            id: parse_uuid(&self.id)?,
            workflow_id: parse_uuid(&self.workflow_id)?,
            input_data,
            status,
            output_data,
            log: self.log,
            started_at: parse_datetime(&self.started_at)?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
        })
    }
}

struct ChatRow {
    execution_id: String,
    role: String,
    content: String,
    timestamp: String,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            execution_id: row.try_get("execution_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    fn into_entry(self) -> Result<ChatEntry, RepositoryError> {
        let role: ChatRole = self.role.parse().map_err(RepositoryError::Query)?;
        Ok(ChatEntry {
            execution_id: parse_uuid(&self.execution_id)?,
            role,
            content: self.content,
            timestamp: parse_datetime(&self.timestamp)?,
        })
    }
}

// ---------------------------------------------------------------------------
// ExecutionRepository
// ---------------------------------------------------------------------------

impl ExecutionRepository for SqliteExecutionRepository {
    async fn append_chat_entry(&self, entry: &ChatEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_history (execution_id, role, content, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.execution_id.to_string())
        .bind(entry.role.to_string())
        .bind(&entry.content)
        .bind(format_datetime(&entry.timestamp))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn load_execution_record(&self, id: &Uuid) -> Result<Option<ExecutionRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflow_executions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| ExecutionRow::from_row(&row).map_err(query_error)?.into_record())
            .transpose()
    }

    async fn save_execution_record(&self, record: &ExecutionRecord) -> Result<(), RepositoryError> {
        let input_json = serde_json::to_string(&record.input_data)
            .map_err(|e| RepositoryError::Query(format!("serialize input_data: {e}")))?;
        let output_json = record
            .output_data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("serialize output_data: {e}")))?;

        sqlx::query(
            r#"INSERT INTO workflow_executions
                 (id, workflow_id, input_data, status, output_data, log, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 output_data = excluded.output_data,
                 log = excluded.log,
                 started_at = excluded.started_at,
                 completed_at = excluded.completed_at"#,
        )
        .bind(record.id.to_string())
        .bind(record.workflow_id.to_string())
        .bind(&input_json)
        .bind(record.status.to_string())
        .bind(&output_json)
        .bind(&record.log)
        .bind(format_datetime(&record.started_at))
        .bind(record.completed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn load_workflow_graph(&self, workflow_id: &Uuid) -> Result<Option<WorkflowSnapshot>, RepositoryError> {
        let row = sqlx::query("SELECT nodes, edges FROM workflows WHERE id = ?")
            .bind(workflow_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let nodes: String = row.try_get("nodes").map_err(query_error)?;
        let edges: String = row.try_get("edges").map_err(query_error)?;
        Ok(Some((parse_nodes(&nodes)?, parse_edges(&edges)?)))
    }

    async fn list_chat_entries(&self, execution_id: &Uuid) -> Result<Vec<ChatEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_history WHERE execution_id = ? ORDER BY timestamp ASC, seq ASC",
        )
        .bind(execution_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| ChatRow::from_row(row).map_err(query_error)?.into_entry())
            .collect()
    }
}
