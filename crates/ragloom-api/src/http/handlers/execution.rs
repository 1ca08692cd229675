//! Execution inspection handlers.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub fn execution_routes() -> Router<AppState> {
    Router::new()
        .route("/executions/{id}", get(get_execution))
        .route("/executions/{id}/chat", get(get_chat))
}

/// GET /api/v1/executions/:id
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let record = state
        .execution_service
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Execution {id} not found")))?;

    let data = serde_json::to_value(&record).map_err(|e| AppError::Internal(e.to_string()))?;
    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/executions/{id}"))
        .with_link("chat", &format!("/api/v1/executions/{id}/chat"))
        .with_link("workflow", &format!("/api/v1/workflows/{}", record.workflow_id));

    Ok(Json(resp))
}

/// GET /api/v1/executions/:id/chat - Chat entries in insertion order.
pub async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if state.execution_service.get(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Execution {id} not found")));
    }
    let entries = state.execution_service.chat(&id).await?;

    let data = serde_json::to_value(&entries).map_err(|e| AppError::Internal(e.to_string()))?;
    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("execution", &format!("/api/v1/executions/{id}"));

    Ok(Json(resp))
}
