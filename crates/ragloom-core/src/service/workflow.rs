//! Workflow definition management.
//!
//! CRUD over saved workflows plus a dry-run validator that loads the graph
//! and previews the processing order without calling any collaborator.

use chrono::Utc;
use ragloom_types::error::RepositoryError;
use ragloom_types::workflow::{EdgeSpec, NodeSpec, WorkflowDefinition, WorkflowDraft};
use serde::Serialize;
use uuid::Uuid;

use crate::repository::workflow::WorkflowRepository;
use crate::workflow::graph::{Graph, GraphError};
use crate::workflow::resolver::execution_order;

/// Errors from workflow management.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowServiceError {
    #[error("workflow {0} not found")]
    NotFound(Uuid),

    #[error("invalid workflow name: {0}")]
    InvalidName(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Dry-run view of how a workflow would be processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowPlan {
    /// Nodes with no incoming edge.
    pub start_nodes: Vec<String>,
    /// Ready batches in processing order.
    pub batches: Vec<Vec<String>>,
    /// Nodes a run would never reach.
    pub unreached: Vec<String>,
    /// Nodes sitting on a cycle.
    pub cyclic: Vec<String>,
}

/// Load `nodes`/`edges` as a graph and compute its plan.
pub fn plan_workflow(nodes: &[NodeSpec], edges: &[EdgeSpec]) -> Result<WorkflowPlan, GraphError> {
    let graph = Graph::load(nodes, edges)?;
    let (batches, unreached) = execution_order(&graph);
    let owned = |ids: Vec<&str>| ids.into_iter().map(String::from).collect::<Vec<_>>();
    Ok(WorkflowPlan {
        start_nodes: owned(graph.start_nodes()),
        batches,
        unreached,
        cyclic: owned(graph.cyclic_nodes()),
    })
}

/// Service over a [`WorkflowRepository`].
pub struct WorkflowService<W: WorkflowRepository> {
    repo: W,
}

impl<W: WorkflowRepository> WorkflowService<W> {
    pub fn new(repo: W) -> Self {
        Self { repo }
    }

    /// Save a new workflow with a fresh UUIDv7.
    pub async fn create(&self, draft: WorkflowDraft) -> Result<WorkflowDefinition, WorkflowServiceError> {
        let name = validate_name(&draft.name)?;
        let now = Utc::now();
        let def = WorkflowDefinition {
            id: Uuid::now_v7(),
            name,
            description: draft.description,
            nodes: draft.nodes,
            edges: draft.edges,
            created_at: now,
            updated_at: now,
        };
        self.repo.save_definition(&def).await?;
        tracing::info!(workflow_id = %def.id, name = def.name.as_str(), "workflow created");
        Ok(def)
    }

    pub async fn get(&self, id: &Uuid) -> Result<WorkflowDefinition, WorkflowServiceError> {
        self.repo
            .get_definition(id)
            .await?
            .ok_or(WorkflowServiceError::NotFound(*id))
    }

    pub async fn list(&self) -> Result<Vec<WorkflowDefinition>, WorkflowServiceError> {
        Ok(self.repo.list_definitions().await?)
    }

    /// Replace name, description, nodes and edges of an existing workflow.
    pub async fn update(
        &self,
        id: &Uuid,
        draft: WorkflowDraft,
    ) -> Result<WorkflowDefinition, WorkflowServiceError> {
        let mut def = self.get(id).await?;
        def.name = validate_name(&draft.name)?;
        def.description = draft.description;
        def.nodes = draft.nodes;
        def.edges = draft.edges;
        def.updated_at = Utc::now();
        self.repo.save_definition(&def).await?;
        Ok(def)
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), WorkflowServiceError> {
        if self.repo.delete_definition(id).await? {
            tracing::info!(workflow_id = %id, "workflow deleted");
            Ok(())
        } else {
            Err(WorkflowServiceError::NotFound(*id))
        }
    }

    /// Plan a saved workflow. The outer error is storage, the inner one the graph.
    pub async fn validate(
        &self,
        id: &Uuid,
    ) -> Result<Result<WorkflowPlan, GraphError>, WorkflowServiceError> {
        let def = self.get(id).await?;
        Ok(plan_workflow(&def.nodes, &def.edges))
    }
}

fn validate_name(name: &str) -> Result<String, WorkflowServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WorkflowServiceError::InvalidName(
            "name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}
