use thiserror::Error;

use crate::execution::ExecutionStatus;

/// Errors from repository operations (used by trait definitions in ragloom-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors raised by a retrieval collaborator.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("document {0} not found")]
    DocumentNotFound(i64),

    #[error("embedding request failed: {0}")]
    Embedding(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors raised by a generation collaborator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key supplied for model '{model}'")]
    MissingCredential { model: String },

    #[error("unsupported model: '{0}'")]
    UnsupportedModel(String),

    #[error("provider request failed: {0}")]
    Provider(String),

    #[error("provider returned status {status}: {message}")]
    ProviderStatus { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// An execution record was asked to make a move its state machine forbids.
#[derive(Debug, Error)]
#[error("invalid execution transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
}
