//! In-memory collaborators for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use ragloom_types::chat::ChatEntry;
use ragloom_types::error::{GenerationError, RepositoryError, RetrievalError};
use ragloom_types::execution::ExecutionRecord;
use ragloom_types::llm::{Generation, GenerationRequest, RetrievalQuery};
use ragloom_types::workflow::{EdgeSpec, NodeSpec};
use serde_json::Value;
use uuid::Uuid;

use crate::llm::GenerationService;
use crate::repository::execution::{ExecutionRepository, WorkflowSnapshot};
use crate::retrieval::RetrievalService;

pub fn node(id: &str, kind: &str, data: Value) -> NodeSpec {
    NodeSpec {
        id: id.to_string(),
        kind: kind.to_string(),
        data: data.as_object().cloned().unwrap_or_default(),
    }
}

pub fn edge(source: &str, target: &str) -> EdgeSpec {
    EdgeSpec::new(source, target)
}

// ---------------------------------------------------------------------------
// MemoryRepo
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRepo {
    pub records: Mutex<HashMap<Uuid, ExecutionRecord>>,
    pub graphs: Mutex<HashMap<Uuid, WorkflowSnapshot>>,
    pub chat: Mutex<Vec<ChatEntry>>,
    pub saves: AtomicUsize,
    /// Saves numbered at or above this (1-based) fail. Zero never fails.
    pub fail_saves_from: AtomicUsize,
}

impl MemoryRepo {
    pub fn with_workflow(nodes: Vec<NodeSpec>, edges: Vec<EdgeSpec>) -> (Self, Uuid) {
        let repo = Self::default();
        let workflow_id = Uuid::now_v7();
        repo.graphs
            .lock()
            .unwrap()
            .insert(workflow_id, (nodes, edges));
        (repo, workflow_id)
    }

    /// Insert a pending record and return its id.
    pub fn pending(&self, workflow_id: Uuid, input: Value) -> Uuid {
        let record = ExecutionRecord::new(workflow_id, input);
        let id = record.id;
        self.records.lock().unwrap().insert(id, record);
        id
    }

    pub fn record(&self, id: &Uuid) -> ExecutionRecord {
        self.records.lock().unwrap()[id].clone()
    }

    pub fn chat_for(&self, execution_id: &Uuid) -> Vec<ChatEntry> {
        self.chat
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.execution_id == *execution_id)
            .cloned()
            .collect()
    }
}

impl ExecutionRepository for MemoryRepo {
    async fn append_chat_entry(&self, entry: &ChatEntry) -> Result<(), RepositoryError> {
        self.chat.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn load_execution_record(
        &self,
        id: &Uuid,
    ) -> Result<Option<ExecutionRecord>, RepositoryError> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    async fn save_execution_record(&self, record: &ExecutionRecord) -> Result<(), RepositoryError> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_from = self.fail_saves_from.load(Ordering::SeqCst);
        if fail_from != 0 && n >= fail_from {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn load_workflow_graph(
        &self,
        workflow_id: &Uuid,
    ) -> Result<Option<WorkflowSnapshot>, RepositoryError> {
        Ok(self.graphs.lock().unwrap().get(workflow_id).cloned())
    }

    async fn list_chat_entries(&self, execution_id: &Uuid) -> Result<Vec<ChatEntry>, RepositoryError> {
        Ok(self.chat_for(execution_id))
    }
}

// ---------------------------------------------------------------------------
// Retrieval / generation fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRetrieval {
    pub calls: AtomicUsize,
}

impl FakeRetrieval {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RetrievalService for FakeRetrieval {
    async fn search(&self, query: &RetrievalQuery) -> Result<Vec<String>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(query
            .document_ids
            .iter()
            .map(|id| format!("doc {id}: {}", query.query))
            .collect())
    }
}

/// Answers `"<model> says: <query>"` and remembers what it was asked.
#[derive(Default)]
pub struct FakeGeneration {
    /// (query, context) per call.
    pub requests: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeGeneration {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl GenerationService for FakeGeneration {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.query.clone(), request.context.clone()));
        Ok(Generation {
            text: format!("{} says: {}", request.model, request.query),
            sources: Vec::new(),
        })
    }
}
