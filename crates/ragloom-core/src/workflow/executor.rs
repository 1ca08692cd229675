//! Node executor for the four node kinds.
//!
//! `NodeExecutor` dispatches a node to its kind-specific handler, reading the
//! merged predecessor outputs and calling out to the retrieval and generation
//! collaborators. It never fails outward: any handler error becomes the
//! node's `NodeOutput::Error`.
//!
//! Node kinds: UserQuery, KnowledgeBase, LlmEngine, Output.

use ragloom_types::chat::{ChatEntry, ChatRole};
use ragloom_types::error::{GenerationError, RepositoryError, RetrievalError};
use ragloom_types::llm::{DEFAULT_LLM_QUERY, GenerationRequest, RetrievalQuery};
use ragloom_types::workflow::{NodeKind, NodeOutput};
use secrecy::SecretString;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::llm::GenerationService;
use crate::repository::execution::ExecutionRepository;
use crate::retrieval::RetrievalService;

use super::graph::Node;
use super::input::MergedInput;

// ---------------------------------------------------------------------------
// NodeExecutionError
// ---------------------------------------------------------------------------

/// Errors a node handler can hit. Rendered into `NodeOutput::Error`.
#[derive(Debug, thiserror::Error)]
pub enum NodeExecutionError {
    /// An LlmEngine node without a `model` in its config.
    #[error("Model is required for LLM Engine node '{node_id}'")]
    MissingModel { node_id: String },

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("failed to append chat entry: {0}")]
    ChatLog(RepositoryError),
}

// ---------------------------------------------------------------------------
// ChatLog
// ---------------------------------------------------------------------------

/// Append-only chat log for one execution.
///
/// Appends go through an async mutex so entries from concurrently running
/// nodes are written one at a time.
pub struct ChatLog<'a, P: ExecutionRepository> {
    repo: &'a P,
    execution_id: Uuid,
    gate: Mutex<()>,
}

impl<'a, P: ExecutionRepository> ChatLog<'a, P> {
    pub fn new(repo: &'a P, execution_id: Uuid) -> Self {
        Self {
            repo,
            execution_id,
            gate: Mutex::new(()),
        }
    }

    pub async fn append(&self, role: ChatRole, content: &str) -> Result<(), RepositoryError> {
        let _guard = self.gate.lock().await;
        let entry = ChatEntry::new(self.execution_id, role, content);
        self.repo.append_chat_entry(&entry).await
    }
}

// ---------------------------------------------------------------------------
// NodeExecutor
// ---------------------------------------------------------------------------

/// Runs single nodes against the collaborators of one execution.
pub struct NodeExecutor<'a, P: ExecutionRepository, R: RetrievalService, G: GenerationService> {
    retrieval: &'a R,
    generation: &'a G,
    chat_log: &'a ChatLog<'a, P>,
    top_k: usize,
}

impl<'a, P, R, G> NodeExecutor<'a, P, R, G>
where
    P: ExecutionRepository,
    R: RetrievalService,
    G: GenerationService,
{
    pub fn new(retrieval: &'a R, generation: &'a G, chat_log: &'a ChatLog<'a, P>, top_k: usize) -> Self {
        Self {
            retrieval,
            generation,
            chat_log,
            top_k,
        }
    }

    /// Run one node. Failures are returned as `NodeOutput::Error`.
    pub async fn execute(&self, node: &Node, input: &MergedInput) -> NodeOutput {
        tracing::debug!(
            node_id = node.id.as_str(),
            kind = %node.kind,
            inputs = input.len(),
            "processing node"
        );
        tracing::trace!(node_id = node.id.as_str(), input = %input.to_value(), "merged input");

        let result = match node.kind {
            NodeKind::UserQuery => self.run_user_query(node, input).await,
            NodeKind::KnowledgeBase => self.run_knowledge_base(node, input).await,
            NodeKind::LlmEngine => self.run_llm_engine(node, input).await,
            NodeKind::Output => self.run_output(input).await,
        };

        match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    node_id = node.id.as_str(),
                    kind = %node.kind,
                    error = %e,
                    "node failed"
                );
                NodeOutput::error(e.to_string())
            }
        }
    }

    async fn run_user_query(
        &self,
        node: &Node,
        input: &MergedInput,
    ) -> Result<NodeOutput, NodeExecutionError> {
        let query = input
            .initial_query()
            .or_else(|| node.config.get("query").and_then(|v| v.as_str()))
            .unwrap_or_default()
            .to_string();

        self.chat_log
            .append(ChatRole::User, &query)
            .await
            .map_err(NodeExecutionError::ChatLog)?;

        Ok(NodeOutput::UserQuery { query })
    }

    async fn run_knowledge_base(
        &self,
        node: &Node,
        input: &MergedInput,
    ) -> Result<NodeOutput, NodeExecutionError> {
        let Some(query) = input.first_user_query().filter(|q| !q.is_empty()) else {
            return Ok(NodeOutput::KnowledgeBase {
                context: String::new(),
            });
        };

        let document_ids = node.document_ids();
        if document_ids.is_empty() {
            return Ok(NodeOutput::KnowledgeBase {
                context: String::new(),
            });
        }

        let request = RetrievalQuery {
            query: query.to_string(),
            document_ids,
            api_key: secret(node, "embeddingApiKey"),
            top_k: self.top_k,
        };
        let passages = self.retrieval.search(&request).await?;

        Ok(NodeOutput::KnowledgeBase {
            context: passages.join("\n"),
        })
    }

    async fn run_llm_engine(
        &self,
        node: &Node,
        input: &MergedInput,
    ) -> Result<NodeOutput, NodeExecutionError> {
        let model = node
            .config_str("model")
            .ok_or_else(|| NodeExecutionError::MissingModel {
                node_id: node.id.clone(),
            })?;

        let query = input
            .first_user_query()
            .filter(|q| !q.is_empty())
            .or_else(|| node.config_str("query"))
            .unwrap_or(DEFAULT_LLM_QUERY);

        let request = GenerationRequest {
            query: query.to_string(),
            model: model.to_string(),
            context: input
                .first_knowledge_base()
                .filter(|c| !c.is_empty())
                .map(String::from),
            custom_prompt: node.config_str("customPrompt").map(String::from),
            use_web_search: node.config_flag("useWebSearch"),
            api_key: secret(node, "apiKey"),
        };
        let generation = self.generation.generate(&request).await?;

        Ok(NodeOutput::LlmResponse {
            response: generation.text,
            sources: generation.sources,
        })
    }

    async fn run_output(&self, input: &MergedInput) -> Result<NodeOutput, NodeExecutionError> {
        let (response, sources) = input
            .first_llm_response()
            .map(|(text, sources)| (text.to_string(), sources.to_vec()))
            .unwrap_or_default();

        self.chat_log
            .append(ChatRole::Assistant, &response)
            .await
            .map_err(NodeExecutionError::ChatLog)?;

        Ok(NodeOutput::Output { response, sources })
    }
}

fn secret(node: &Node, key: &str) -> Option<SecretString> {
    node.config_str(key)
        .map(|value| SecretString::from(value.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ragloom_types::execution::ExecutionRecord;
    use ragloom_types::llm::Generation;
    use ragloom_types::workflow::NodeSpec;
    use serde_json::json;

    use super::*;
    use crate::repository::execution::WorkflowSnapshot;

    // -- fakes --------------------------------------------------------------

    #[derive(Default)]
    struct RecordingRepo {
        chat: std::sync::Mutex<Vec<ChatEntry>>,
        fail_appends: bool,
    }

    impl ExecutionRepository for RecordingRepo {
        async fn append_chat_entry(&self, entry: &ChatEntry) -> Result<(), RepositoryError> {
            if self.fail_appends {
                return Err(RepositoryError::Connection);
            }
            self.chat.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn load_execution_record(
            &self,
            _id: &Uuid,
        ) -> Result<Option<ExecutionRecord>, RepositoryError> {
            Ok(None)
        }

        async fn save_execution_record(&self, _record: &ExecutionRecord) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn load_workflow_graph(
            &self,
            _workflow_id: &Uuid,
        ) -> Result<Option<WorkflowSnapshot>, RepositoryError> {
            Ok(None)
        }

        async fn list_chat_entries(
            &self,
            _execution_id: &Uuid,
        ) -> Result<Vec<ChatEntry>, RepositoryError> {
            Ok(self.chat.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct CountingRetrieval {
        calls: AtomicUsize,
        last_ids: std::sync::Mutex<Vec<i64>>,
    }

    impl RetrievalService for CountingRetrieval {
        async fn search(&self, query: &RetrievalQuery) -> Result<Vec<String>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_ids.lock().unwrap() = query.document_ids.clone();
            Ok(vec![
                format!("passage about {}", query.query),
                "second passage".to_string(),
            ])
        }
    }

    #[derive(Default)]
    struct EchoGeneration {
        seen: std::sync::Mutex<Vec<(String, Option<String>, bool)>>,
    }

    impl GenerationService for EchoGeneration {
        async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
            if request.model == "needs-key" && request.api_key.is_none() {
                return Err(GenerationError::MissingCredential {
                    model: request.model.clone(),
                });
            }
            self.seen.lock().unwrap().push((
                request.query.clone(),
                request.context.clone(),
                request.use_web_search,
            ));
            Ok(Generation {
                text: format!("echo: {}", request.query),
                sources: vec!["https://source.example".to_string()],
            })
        }
    }

    fn node(id: &str, kind: NodeKind, data: serde_json::Value) -> Node {
        let spec = NodeSpec {
            id: id.to_string(),
            kind: kind.as_tag().to_string(),
            data: data.as_object().cloned().unwrap_or_default(),
        };
        Node {
            id: spec.id,
            kind,
            config: spec.data,
        }
    }

    // -- tests --------------------------------------------------------------

    #[tokio::test]
    async fn user_query_prefers_initial_input() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let n = node("q1", NodeKind::UserQuery, json!({"query": "from config"}));
        let out = exec.execute(&n, &MergedInput::new(json!({"query": "hello"}))).await;
        assert_eq!(out, NodeOutput::UserQuery { query: "hello".into() });

        let out = exec.execute(&n, &MergedInput::new(json!({}))).await;
        assert_eq!(out, NodeOutput::UserQuery { query: "from config".into() });

        let chat = repo.chat.lock().unwrap();
        assert_eq!(chat.len(), 2);
        assert_eq!(chat[0].role, ChatRole::User);
        assert_eq!(chat[0].content, "hello");
    }

    #[tokio::test]
    async fn user_query_defaults_to_empty() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let n = node("q1", NodeKind::UserQuery, json!({}));
        let out = exec.execute(&n, &MergedInput::new(json!(null))).await;
        assert_eq!(out, NodeOutput::UserQuery { query: String::new() });
    }

    #[tokio::test]
    async fn chat_append_failure_becomes_error_output() {
        let repo = RecordingRepo {
            fail_appends: true,
            ..Default::default()
        };
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let n = node("q1", NodeKind::UserQuery, json!({}));
        let out = exec.execute(&n, &MergedInput::new(json!({"query": "x"}))).await;
        match out {
            NodeOutput::Error { error } => assert!(error.contains("chat entry")),
            other => panic!("expected error output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn knowledge_base_without_query_skips_retrieval() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let n = node("kb", NodeKind::KnowledgeBase, json!({"documentIds": [1]}));
        let out = exec.execute(&n, &MergedInput::new(json!({}))).await;
        assert_eq!(out, NodeOutput::KnowledgeBase { context: String::new() });
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn knowledge_base_without_documents_skips_retrieval() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let mut input = MergedInput::new(json!({}));
        input.insert("q1", NodeOutput::UserQuery { query: "rust".into() });
        let n = node("kb", NodeKind::KnowledgeBase, json!({}));
        let out = exec.execute(&n, &input).await;
        assert_eq!(out, NodeOutput::KnowledgeBase { context: String::new() });
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn knowledge_base_joins_passages() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let mut input = MergedInput::new(json!({}));
        input.insert("q1", NodeOutput::UserQuery { query: "rust".into() });
        let n = node("kb", NodeKind::KnowledgeBase, json!({"documentIds": ["4", 9]}));
        let out = exec.execute(&n, &input).await;
        assert_eq!(
            out,
            NodeOutput::KnowledgeBase {
                context: "passage about rust\nsecond passage".into()
            }
        );
        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*r.last_ids.lock().unwrap(), vec![4, 9]);
    }

    #[tokio::test]
    async fn llm_without_model_is_error_output() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let n = node("l1", NodeKind::LlmEngine, json!({}));
        let out = exec.execute(&n, &MergedInput::new(json!({}))).await;
        match out {
            NodeOutput::Error { error } => assert!(error.contains("Model is required")),
            other => panic!("expected error output, got {other:?}"),
        }
        assert!(g.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn llm_uses_upstream_query_and_context() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let mut input = MergedInput::new(json!({}));
        input.insert("kb", NodeOutput::KnowledgeBase { context: "docs".into() });
        input.insert("q1", NodeOutput::UserQuery { query: "hello".into() });
        let n = node(
            "l1",
            NodeKind::LlmEngine,
            json!({"model": "gpt-4o-mini", "useWebSearch": true}),
        );
        let out = exec.execute(&n, &input).await;
        assert_eq!(
            out,
            NodeOutput::LlmResponse {
                response: "echo: hello".into(),
                sources: vec!["https://source.example".into()],
            }
        );
        let seen = g.seen.lock().unwrap();
        assert_eq!(seen[0], ("hello".to_string(), Some("docs".to_string()), true));
    }

    #[tokio::test]
    async fn llm_query_falls_back_to_config_then_default() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let with_query = node("l1", NodeKind::LlmEngine, json!({"model": "m", "query": "cfg"}));
        exec.execute(&with_query, &MergedInput::new(json!({}))).await;
        let bare = node("l2", NodeKind::LlmEngine, json!({"model": "m"}));
        exec.execute(&bare, &MergedInput::new(json!({}))).await;

        let seen = g.seen.lock().unwrap();
        assert_eq!(seen[0].0, "cfg");
        assert_eq!(seen[1].0, DEFAULT_LLM_QUERY);
        assert_eq!(seen[1].1, None);
    }

    #[tokio::test]
    async fn generation_failure_becomes_error_output() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let n = node("l1", NodeKind::LlmEngine, json!({"model": "needs-key"}));
        let out = exec.execute(&n, &MergedInput::new(json!({}))).await;
        assert!(out.is_error());
    }

    #[tokio::test]
    async fn output_copies_first_llm_response_and_logs_assistant() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let mut input = MergedInput::new(json!({}));
        input.insert(
            "l1",
            NodeOutput::LlmResponse {
                response: "answer".into(),
                sources: vec!["s".into()],
            },
        );
        let n = node("o1", NodeKind::Output, json!({}));
        let out = exec.execute(&n, &input).await;
        assert_eq!(
            out,
            NodeOutput::Output {
                response: "answer".into(),
                sources: vec!["s".into()],
            }
        );
        let chat = repo.chat.lock().unwrap();
        assert_eq!(chat[0].role, ChatRole::Assistant);
        assert_eq!(chat[0].content, "answer");
    }

    #[tokio::test]
    async fn output_without_llm_response_is_empty() {
        let repo = RecordingRepo::default();
        let log = ChatLog::new(&repo, Uuid::now_v7());
        let (r, g) = (CountingRetrieval::default(), EchoGeneration::default());
        let exec = NodeExecutor::new(&r, &g, &log, 5);

        let n = node("o1", NodeKind::Output, json!({}));
        let out = exec.execute(&n, &MergedInput::new(json!({}))).await;
        assert_eq!(
            out,
            NodeOutput::Output {
                response: String::new(),
                sources: vec![],
            }
        );
    }
}
