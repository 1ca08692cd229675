//! Application error type mapping to HTTP status codes and envelope format.

use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use ragloom_core::service::workflow::WorkflowServiceError;
use ragloom_core::workflow::orchestrator::EngineError;
use ragloom_infra::retrieval::indexer::IndexError;
use ragloom_types::error::{GenerationError, RepositoryError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Workflow(WorkflowServiceError),
    Engine(EngineError),
    Repository(RepositoryError),
    Index(IndexError),
    Generation(GenerationError),
    NotFound(String),
    Validation(String),
    Internal(String),
}

impl From<WorkflowServiceError> for AppError {
    fn from(e: WorkflowServiceError) -> Self {
        AppError::Workflow(e)
    }
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        AppError::Index(e)
    }
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        AppError::Generation(e)
    }
}

impl AppError {
    /// Envelope error code and message.
    fn code_and_message(&self) -> (&'static str, String) {
        match self {
            AppError::Workflow(e @ WorkflowServiceError::NotFound(_)) => {
                ("WORKFLOW_NOT_FOUND", e.to_string())
            }
            AppError::Workflow(WorkflowServiceError::InvalidName(msg)) => {
                ("VALIDATION_ERROR", msg.clone())
            }
            AppError::Workflow(e) => ("STORAGE_ERROR", e.to_string()),
            AppError::Engine(e @ EngineError::RecordNotFound(_)) => {
                ("EXECUTION_NOT_FOUND", e.to_string())
            }
            AppError::Engine(e @ EngineError::WorkflowNotFound(_)) => {
                ("WORKFLOW_NOT_FOUND", e.to_string())
            }
            AppError::Engine(e @ EngineError::AlreadyStarted { .. }) => {
                ("ALREADY_STARTED", e.to_string())
            }
            AppError::Engine(e @ EngineError::Graph(_)) => ("INVALID_GRAPH", e.to_string()),
            AppError::Engine(e) => ("EXECUTION_ERROR", e.to_string()),
            AppError::Repository(RepositoryError::NotFound) => {
                ("NOT_FOUND", "Entity not found".to_string())
            }
            AppError::Repository(RepositoryError::Conflict(msg)) => ("CONFLICT", msg.clone()),
            AppError::Repository(e) => ("STORAGE_ERROR", e.to_string()),
            AppError::Index(e @ IndexError::DocumentNotFound(_)) => {
                ("DOCUMENT_NOT_FOUND", e.to_string())
            }
            AppError::Index(e @ IndexError::UnsupportedFormat(_)) => {
                ("VALIDATION_ERROR", e.to_string())
            }
            AppError::Index(e) => ("STORAGE_ERROR", e.to_string()),
            AppError::Generation(
                e @ (GenerationError::MissingCredential { .. } | GenerationError::UnsupportedModel(_)),
            ) => ("VALIDATION_ERROR", e.to_string()),
            AppError::Generation(e) => ("LLM_ERROR", e.to_string()),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = self.code_and_message();
        if matches!(
            code,
            "INTERNAL_ERROR" | "STORAGE_ERROR" | "EXECUTION_ERROR" | "LLM_ERROR"
        ) {
            tracing::error!(code, error = %message, "request failed");
        }
        ApiResponse::error(code, &message, Uuid::now_v7().to_string(), 0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn missing_workflow_is_404() {
        let resp = AppError::from(WorkflowServiceError::NotFound(Uuid::nil())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn blank_name_is_400() {
        let resp = AppError::from(WorkflowServiceError::InvalidName("empty".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn engine_errors_map_by_kind() {
        let resp = AppError::from(EngineError::RecordNotFound(Uuid::nil())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::from(EngineError::UnknownNode("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn index_errors_map_by_kind() {
        let resp = AppError::from(IndexError::DocumentNotFound(7)).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::from(IndexError::UnsupportedFormat("a.pdf".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn caller_mistakes_in_generation_are_400() {
        let resp = AppError::from(GenerationError::UnsupportedModel("claude".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::from(GenerationError::MissingCredential { model: "gpt-4o".into() })
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::from(GenerationError::Provider("timeout".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
