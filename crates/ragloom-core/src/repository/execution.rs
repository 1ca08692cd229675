//! Execution persistence port used by the orchestrator.
//!
//! Covers the execution record itself, the workflow snapshot it runs against,
//! and the append-only chat log emitted while it runs.

use ragloom_types::chat::ChatEntry;
use ragloom_types::error::RepositoryError;
use ragloom_types::execution::ExecutionRecord;
use ragloom_types::workflow::{EdgeSpec, NodeSpec};
use uuid::Uuid;

/// Node and edge lists of a workflow, as stored.
pub type WorkflowSnapshot = (Vec<NodeSpec>, Vec<EdgeSpec>);

/// Repository trait for execution records and chat history.
pub trait ExecutionRepository: Send + Sync {
    /// Append one chat entry. Entries are never updated or removed.
    fn append_chat_entry(
        &self,
        entry: &ChatEntry,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get an execution record by ID.
    fn load_execution_record(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ExecutionRecord>, RepositoryError>> + Send;

    /// Upsert an execution record.
    fn save_execution_record(
        &self,
        record: &ExecutionRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Load the nodes and edges of a workflow. `None` if the workflow does not exist.
    fn load_workflow_graph(
        &self,
        workflow_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowSnapshot>, RepositoryError>> + Send;

    /// Chat entries of one execution in timestamp order, ties by insertion order.
    fn list_chat_entries(
        &self,
        execution_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatEntry>, RepositoryError>> + Send;
}
