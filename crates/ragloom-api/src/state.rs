//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository and collaborator traits; AppState pins
//! them to the concrete infra implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragloom_core::service::execution::ExecutionService;
use ragloom_core::service::workflow::WorkflowService;
use ragloom_core::workflow::orchestrator::{EngineSettings, ExecutionOrchestrator};
use ragloom_infra::config::{load_global_config, resolve_data_dir};
use ragloom_infra::http_client;
use ragloom_infra::llm::generator::LlmGenerator;
use ragloom_infra::retrieval::embedding::GeminiEmbedder;
use ragloom_infra::retrieval::indexer::DocumentIndexer;
use ragloom_infra::retrieval::search::DocumentRetriever;
use ragloom_infra::sqlite::document::SqliteDocumentRepository;
use ragloom_infra::sqlite::execution::SqliteExecutionRepository;
use ragloom_infra::sqlite::pool::{database_url, DatabasePool};
use ragloom_infra::sqlite::workflow::SqliteWorkflowRepository;
use ragloom_types::config::GlobalConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteWorkflowService = WorkflowService<SqliteWorkflowRepository>;

pub type ConcreteRetriever = DocumentRetriever<SqliteDocumentRepository, GeminiEmbedder>;

pub type ConcreteExecutionService =
    ExecutionService<SqliteExecutionRepository, ConcreteRetriever, LlmGenerator>;

pub type ConcreteIndexer = DocumentIndexer<SqliteDocumentRepository, GeminiEmbedder>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflow_service: Arc<ConcreteWorkflowService>,
    pub execution_service: Arc<ConcreteExecutionService>,
    pub document_repo: Arc<SqliteDocumentRepository>,
    pub indexer: Arc<ConcreteIndexer>,
    /// Same generator the engine uses; also serves one-shot chat requests.
    pub generator: Arc<LlmGenerator>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize from the resolved data directory and its `config.toml`.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;
        let config = load_global_config(&data_dir).await;
        Self::init_at(&data_dir, config).await
    }

    /// Connect to the database under `data_dir` and wire services.
    pub async fn init_at(data_dir: &Path, config: GlobalConfig) -> anyhow::Result<Self> {
        let db_pool = DatabasePool::new(&database_url(data_dir)).await?;
        let client = http_client(config.llm.timeout_secs)?;

        let document_repo = Arc::new(SqliteDocumentRepository::new(db_pool.clone()));
        let embedder = Arc::new(GeminiEmbedder::new(client.clone()));

        let execution_repo = Arc::new(SqliteExecutionRepository::new(db_pool.clone()));
        let retriever = Arc::new(DocumentRetriever::new(
            document_repo.clone(),
            embedder.clone(),
        ));
        let generator = Arc::new(LlmGenerator::new(client, &config.llm, &config.web_search));
        let settings = EngineSettings {
            top_k: config.retrieval.top_k,
            concurrent_batches: config.engine.concurrent_batches,
        };
        let orchestrator =
            ExecutionOrchestrator::new(execution_repo.clone(), retriever, generator.clone(), settings);

        let indexer = DocumentIndexer::new(
            document_repo.clone(),
            embedder,
            data_dir.join("uploads"),
            config.retrieval.chunk_size,
            config.retrieval.chunk_overlap,
        );

        tracing::debug!(data_dir = %data_dir.display(), ?settings, "application state ready");

        Ok(Self {
            workflow_service: Arc::new(WorkflowService::new(SqliteWorkflowRepository::new(
                db_pool.clone(),
            ))),
            execution_service: Arc::new(ExecutionService::new(execution_repo, orchestrator)),
            document_repo,
            indexer: Arc::new(indexer),
            generator,
            config: Arc::new(config),
            data_dir: data_dir.to_path_buf(),
            db_pool,
        })
    }
}
