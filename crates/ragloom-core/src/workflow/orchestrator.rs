//! Execution orchestrator: drives one execution record from `Pending` to a
//! terminal state.
//!
//! # Execution flow
//!
//! 1. Load the record; it must be `Pending`. Mark it `Running` and save.
//! 2. Load the workflow snapshot and build the `Graph`.
//! 3. Ask the resolver for ready nodes, run them through the `NodeExecutor`,
//!    record their outputs in the per-run `RunState`; repeat until finished
//!    or stalled.
//! 4. Collect the outputs of `Output` nodes into the final payload and mark
//!    the record `Completed`.
//!
//! Node failures are data (`NodeOutput::Error`) and never fail the run. Any
//! `EngineError` after the record was loaded marks it `Failed` with the
//! error message as its log.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use ragloom_types::error::{InvalidTransition, RepositoryError};
use ragloom_types::execution::{ExecutionRecord, ExecutionStatus};
use ragloom_types::workflow::{NodeKind, NodeOutput};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::llm::GenerationService;
use crate::repository::execution::ExecutionRepository;
use crate::retrieval::RetrievalService;

use super::executor::{ChatLog, NodeExecutor};
use super::graph::{Graph, GraphError, Node};
use super::input::MergedInput;
use super::resolver::{DependencyResolver, Readiness};
use super::state::{DuplicateOutput, RunState};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Knobs for the orchestration loop.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Passages requested per KnowledgeBase node.
    pub top_k: usize,
    /// Run the nodes of a ready batch concurrently instead of one by one.
    pub concurrent_batches: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            concurrent_batches: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionOutcome
// ---------------------------------------------------------------------------

/// Result of a completed execution.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// The record in its final, persisted state.
    pub record: ExecutionRecord,
    /// Output of every processed node.
    pub node_outputs: HashMap<String, NodeOutput>,
    /// Node ids in the order they were processed.
    pub processed: Vec<String>,
    /// Nodes the run could not reach because it stalled, in node-list order.
    pub unreached: Vec<String>,
}

impl ExecutionOutcome {
    pub fn stalled(&self) -> bool {
        !self.unreached.is_empty()
    }
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Faults that fail an execution.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("execution {0} not found")]
    RecordNotFound(Uuid),

    #[error("execution {id} already started (status: {status})")]
    AlreadyStarted { id: Uuid, status: ExecutionStatus },

    #[error("workflow {0} not found")]
    WorkflowNotFound(Uuid),

    #[error("invalid workflow graph: {0}")]
    Graph(#[from] GraphError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    DuplicateOutput(#[from] DuplicateOutput),

    #[error(transparent)]
    State(#[from] InvalidTransition),

    #[error("node '{0}' is not part of the graph")]
    UnknownNode(String),
}

/// What the node loop produced before the record is finalized.
struct RunReport {
    state: RunState,
    unreached: Vec<String>,
    final_output: Value,
}

// ---------------------------------------------------------------------------
// ExecutionOrchestrator
// ---------------------------------------------------------------------------

/// Runs executions against a persistence port and two collaborators.
///
/// Holds no per-run state: every call to [`run`](Self::run) owns its own
/// `RunState`, so independent executions can run in parallel.
pub struct ExecutionOrchestrator<P, R, G>
where
    P: ExecutionRepository,
    R: RetrievalService,
    G: GenerationService,
{
    repo: Arc<P>,
    retrieval: Arc<R>,
    generation: Arc<G>,
    settings: EngineSettings,
}

impl<P, R, G> ExecutionOrchestrator<P, R, G>
where
    P: ExecutionRepository,
    R: RetrievalService,
    G: GenerationService,
{
    pub fn new(repo: Arc<P>, retrieval: Arc<R>, generation: Arc<G>, settings: EngineSettings) -> Self {
        Self {
            repo,
            retrieval,
            generation,
            settings,
        }
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Run the `Pending` execution `execution_id` to completion.
    ///
    /// A record that is missing or not `Pending` is returned as an error and
    /// left untouched. Other faults mark the record `Failed` on a best-effort
    /// basis. The `Completed` record is built before the final save, so if
    /// that save fails the stored record stays `Running`.
    pub async fn run(&self, execution_id: Uuid) -> Result<ExecutionOutcome, EngineError> {
        let mut record = self
            .repo
            .load_execution_record(&execution_id)
            .await?
            .ok_or(EngineError::RecordNotFound(execution_id))?;

        if record.status != ExecutionStatus::Pending {
            return Err(EngineError::AlreadyStarted {
                id: execution_id,
                status: record.status,
            });
        }

        record.begin()?;
        if let Err(e) = self.repo.save_execution_record(&record).await {
            let e = EngineError::from(e);
            self.mark_failed(&mut record, &e).await;
            return Err(e);
        }

        tracing::info!(
            execution_id = %execution_id,
            workflow_id = %record.workflow_id,
            concurrent = self.settings.concurrent_batches,
            "starting workflow execution"
        );
        let started = std::time::Instant::now();

        let report = match self.drive(&record).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(execution_id = %execution_id, error = %e, "workflow execution failed");
                self.mark_failed(&mut record, &e).await;
                return Err(e);
            }
        };

        let processed = report.state.processed().len();
        let mut log = format!("Processed {processed} nodes successfully");
        if !report.unreached.is_empty() {
            log.push_str(&format!(
                "; stalled before reaching: {}",
                report.unreached.join(", ")
            ));
        }

        record.complete(report.final_output, log)?;
        self.repo.save_execution_record(&record).await?;

        tracing::info!(
            execution_id = %execution_id,
            processed,
            unreached = report.unreached.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "workflow execution completed"
        );

        let (node_outputs, processed) = report.state.into_parts();
        Ok(ExecutionOutcome {
            record,
            node_outputs,
            processed,
            unreached: report.unreached,
        })
    }

    /// Load the graph and process nodes until finished or stalled.
    async fn drive(&self, record: &ExecutionRecord) -> Result<RunReport, EngineError> {
        let (nodes, edges) = self
            .repo
            .load_workflow_graph(&record.workflow_id)
            .await?
            .ok_or(EngineError::WorkflowNotFound(record.workflow_id))?;
        let graph = Graph::load(&nodes, &edges)?;

        let chat_log = ChatLog::new(self.repo.as_ref(), record.id);
        let executor = NodeExecutor::new(
            self.retrieval.as_ref(),
            self.generation.as_ref(),
            &chat_log,
            self.settings.top_k,
        );
        let resolver = DependencyResolver::new(&graph);
        let mut state = RunState::new();

        let unreached = loop {
            let batch = match resolver.next_batch(state.completed()) {
                Readiness::Ready(batch) => batch,
                Readiness::Finished => break Vec::new(),
                Readiness::Stalled { pending } => {
                    tracing::warn!(
                        execution_id = %record.id,
                        pending = ?pending,
                        cyclic = ?graph.cyclic_nodes(),
                        "no node can make progress, stopping"
                    );
                    break pending;
                }
            };

            tracing::debug!(execution_id = %record.id, nodes = ?batch, "processing batch");

            let jobs: Vec<(&Node, MergedInput)> = batch
                .iter()
                .map(|id| {
                    let node = graph
                        .node(id)
                        .ok_or_else(|| EngineError::UnknownNode(id.clone()))?;
                    let input = MergedInput::assemble(&graph, id, &state, &record.input_data);
                    Ok((node, input))
                })
                .collect::<Result<_, EngineError>>()?;

            if self.settings.concurrent_batches {
                let outputs = join_all(
                    jobs.iter()
                        .map(|(node, input)| executor.execute(node, input)),
                )
                .await;
                for ((node, _), output) in jobs.iter().zip(outputs) {
                    state.record(&node.id, output)?;
                }
            } else {
                for (node, input) in &jobs {
                    let output = executor.execute(node, input).await;
                    state.record(&node.id, output)?;
                }
            }
        };

        let final_output = collect_final_output(&graph, &state);
        Ok(RunReport {
            state,
            unreached,
            final_output,
        })
    }

    /// Best-effort transition to `Failed`.
    async fn mark_failed(&self, record: &mut ExecutionRecord, error: &EngineError) {
        if record.status.is_terminal() {
            return;
        }
        if let Err(e) = record.fail(error.to_string()) {
            tracing::warn!(execution_id = %record.id, error = %e, "cannot mark execution failed");
            return;
        }
        if let Err(save_err) = self.repo.save_execution_record(record).await {
            tracing::warn!(
                execution_id = %record.id,
                error = %save_err,
                "failed to persist failed execution status"
            );
        }
    }
}

/// `{<output node id>: <its serialized output>}` for every processed Output node.
fn collect_final_output(graph: &Graph, state: &RunState) -> Value {
    let mut map = Map::new();
    for node in graph.nodes().iter().filter(|n| n.kind == NodeKind::Output) {
        if let Some(output) = state.output(&node.id) {
            let value = serde_json::to_value(output).unwrap_or(Value::Null);
            map.insert(node.id.clone(), value);
        }
    }
    Value::Object(map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
