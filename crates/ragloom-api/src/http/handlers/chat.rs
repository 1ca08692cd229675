//! One-shot generation outside any workflow.

use std::time::Instant;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use ragloom_core::llm::GenerationService;
use ragloom_types::llm::GenerationRequest;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub model: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub use_web_search: bool,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ChatRequest {
    fn into_generation(self) -> Result<GenerationRequest, AppError> {
        if self.query.trim().is_empty() {
            return Err(AppError::Validation("query must not be empty".to_string()));
        }
        Ok(GenerationRequest {
            query: self.query,
            model: self.model,
            context: self.context,
            custom_prompt: self.custom_prompt,
            use_web_search: self.use_web_search,
            api_key: self
                .api_key
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from),
        })
    }
}

pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

/// POST /api/v1/chat - Answer a single query with the chosen model.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let request = body.into_generation()?;
    let generation = state.generator.generate(&request).await?;

    let data = serde_json::json!({
        "response": generation.text,
        "sources": generation.sources,
        "model_used": request.model,
    });
    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(data, request_id, elapsed)))
}
