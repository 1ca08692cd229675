//! Workflow CRUD and execution handlers for the REST API.
//!
//! Endpoints for managing workflow definitions and running them. Runs are
//! synchronous: the response carries the finished execution.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use ragloom_types::workflow::WorkflowDraft;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /workflows/{id}/execute`. An empty body runs with `{}`.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub input_data: Option<Value>,
}

impl ExecuteRequest {
    fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
    }

    fn into_input(self) -> Result<Value, AppError> {
        match self.input_data {
            None | Some(Value::Null) => Ok(Value::Object(Default::default())),
            Some(v @ Value::Object(_)) => Ok(v),
            Some(_) => Err(AppError::Validation(
                "input_data must be a JSON object".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the workflow sub-router. Mounted at `/api/v1` by the main router.
pub fn workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/workflows", post(create_workflow).get(list_workflows))
        .route(
            "/workflows/{id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/workflows/{id}/execute", post(execute_workflow))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

// ---------------------------------------------------------------------------
// Workflow CRUD handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows - Save a new workflow definition.
pub async fn create_workflow(
    State(state): State<AppState>,
    Json(body): Json<WorkflowDraft>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let def = state.workflow_service.create(body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(to_json(&def)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/workflows/{}", def.id))
        .with_link("execute", &format!("/api/v1/workflows/{}/execute", def.id));

    Ok(Json(resp))
}

/// GET /api/v1/workflows - List all workflow definitions.
pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let defs = state.workflow_service.list().await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(to_json(&defs)?, request_id, elapsed)
        .with_link("self", "/api/v1/workflows");

    Ok(Json(resp))
}

/// GET /api/v1/workflows/:id
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let def = state.workflow_service.get(&id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(to_json(&def)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/workflows/{}", def.id))
        .with_link("execute", &format!("/api/v1/workflows/{}/execute", def.id));

    Ok(Json(resp))
}

/// PUT /api/v1/workflows/:id - Replace a workflow's name, description and graph.
pub async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<WorkflowDraft>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let def = state.workflow_service.update(&id, body).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(to_json(&def)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/workflows/{}", def.id));

    Ok(Json(resp))
}

/// DELETE /api/v1/workflows/:id
pub async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.workflow_service.delete(&id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({"deleted": true, "id": id.to_string()}),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows/:id/execute - Run a workflow to completion.
pub async fn execute_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let input = ExecuteRequest::from_body(&body)?.into_input()?;

    // 404 before a record is created for a workflow that does not exist.
    state.workflow_service.get(&id).await?;

    let outcome = state.execution_service.start(id, input).await?;
    let execution_id = outcome.record.id;

    let data = serde_json::json!({
        "execution": outcome.record,
        "node_outputs": outcome.node_outputs,
        "unreached": outcome.unreached,
    });

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("execution", &format!("/api/v1/executions/{execution_id}"))
        .with_link("chat", &format!("/api/v1/executions/{execution_id}/chat"));

    Ok(Json(resp))
}
