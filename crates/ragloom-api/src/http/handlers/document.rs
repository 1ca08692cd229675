//! Knowledge-base document handlers for the REST API.
//!
//! Uploads arrive as `multipart/form-data` with a `file` field and an
//! optional `embedding_api_key` field; without a key the chunks are stored
//! unembedded and retrieval falls back to text search.

use std::time::Instant;

use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use ragloom_core::repository::document::DocumentRepository;
use ragloom_infra::retrieval::indexer::IndexError;
use ragloom_types::document::Document;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of `POST /documents/{id}/generate-embeddings`.
#[derive(Debug, Default, Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub embedding_api_key: Option<String>,
}

/// Build the document sub-router. Mounted at `/api/v1` by the main router.
pub fn document_routes() -> Router<AppState> {
    Router::new()
        .route("/documents", post(upload_document).get(list_documents))
        .route("/documents/{id}", get(get_document).delete(delete_document))
        .route("/documents/{id}/generate-embeddings", post(generate_embeddings))
}

fn secret(raw: Option<String>) -> Option<SecretString> {
    raw.filter(|k| !k.trim().is_empty()).map(SecretString::from)
}

/// Document metadata without the extracted text.
fn summary(doc: &Document) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(doc).map_err(|e| AppError::Internal(e.to_string()))?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("extracted_text");
    }
    Ok(value)
}

/// POST /api/v1/documents - Upload and index a text document.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut api_key = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!(error = %e, "failed to read multipart field");
        AppError::Validation(format!("Invalid multipart data: {e}"))
    })? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("file") => {
                let name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("document")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                file = Some((name, bytes.to_vec()));
            }
            Some("embedding_api_key") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid key field: {e}")))?;
                api_key = secret(Some(text));
            }
            other => {
                tracing::debug!(field = ?other, "skipping multipart field");
            }
        }
    }

    let (name, bytes) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    let doc = state.indexer.add_bytes(&name, &bytes, api_key.as_ref()).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(summary(&doc)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/documents/{}", doc.id));

    Ok(Json(resp))
}

/// GET /api/v1/documents - List documents, newest first.
pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let docs = state.document_repo.list_documents().await?;
    let data = docs.iter().map(summary).collect::<Result<Vec<_>, _>>()?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(Value::Array(data), request_id, elapsed)
        .with_link("self", "/api/v1/documents");

    Ok(Json(resp))
}

/// GET /api/v1/documents/:id - Metadata and extracted text.
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let doc = state
        .document_repo
        .get_document(id)
        .await?
        .ok_or(IndexError::DocumentNotFound(id))?;

    let data = serde_json::to_value(&doc).map_err(|e| AppError::Internal(e.to_string()))?;
    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(data, request_id, elapsed)
        .with_link("self", &format!("/api/v1/documents/{id}"))
        .with_link(
            "generate_embeddings",
            &format!("/api/v1/documents/{id}/generate-embeddings"),
        );

    Ok(Json(resp))
}

/// DELETE /api/v1/documents/:id - Remove the document, its chunks and file.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state.indexer.delete(id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        serde_json::json!({"deleted": true, "id": id}),
        request_id,
        elapsed,
    );

    Ok(Json(resp))
}

/// POST /api/v1/documents/:id/generate-embeddings - Re-chunk and embed.
pub async fn generate_embeddings(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<EmbedRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let key = secret(body.embedding_api_key)
        .ok_or_else(|| AppError::Validation("embedding_api_key is required".to_string()))?;
    let doc = state.indexer.reembed(id, &key).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(summary(&doc)?, request_id, elapsed)
        .with_link("self", &format!("/api/v1/documents/{id}"));

    Ok(Json(resp))
}
