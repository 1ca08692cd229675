//! Execution entry points: create a record, run it, read it back.

use std::sync::Arc;

use ragloom_types::chat::ChatEntry;
use ragloom_types::error::RepositoryError;
use ragloom_types::execution::ExecutionRecord;
use serde_json::Value;
use uuid::Uuid;

use crate::llm::GenerationService;
use crate::repository::execution::ExecutionRepository;
use crate::retrieval::RetrievalService;
use crate::workflow::orchestrator::{EngineError, ExecutionOrchestrator, ExecutionOutcome};

/// Service wrapping the orchestrator with record creation and lookups.
pub struct ExecutionService<P, R, G>
where
    P: ExecutionRepository,
    R: RetrievalService,
    G: GenerationService,
{
    repo: Arc<P>,
    orchestrator: ExecutionOrchestrator<P, R, G>,
}

impl<P, R, G> ExecutionService<P, R, G>
where
    P: ExecutionRepository,
    R: RetrievalService,
    G: GenerationService,
{
    pub fn new(repo: Arc<P>, orchestrator: ExecutionOrchestrator<P, R, G>) -> Self {
        Self { repo, orchestrator }
    }

    /// Persist a fresh `Pending` record for `workflow_id`.
    pub async fn create(&self, workflow_id: Uuid, input: Value) -> Result<ExecutionRecord, RepositoryError> {
        let record = ExecutionRecord::new(workflow_id, input);
        self.repo.save_execution_record(&record).await?;
        tracing::debug!(execution_id = %record.id, workflow_id = %workflow_id, "execution created");
        Ok(record)
    }

    /// Create a record and run it.
    pub async fn start(&self, workflow_id: Uuid, input: Value) -> Result<ExecutionOutcome, EngineError> {
        let record = self.create(workflow_id, input).await?;
        self.orchestrator.run(record.id).await
    }

    /// Run a previously created `Pending` record.
    pub async fn run_existing(&self, execution_id: Uuid) -> Result<ExecutionOutcome, EngineError> {
        self.orchestrator.run(execution_id).await
    }

    pub async fn get(&self, execution_id: &Uuid) -> Result<Option<ExecutionRecord>, RepositoryError> {
        self.repo.load_execution_record(execution_id).await
    }

    /// Chat entries of an execution, oldest first.
    pub async fn chat(&self, execution_id: &Uuid) -> Result<Vec<ChatEntry>, RepositoryError> {
        self.repo.list_chat_entries(execution_id).await
    }
}
