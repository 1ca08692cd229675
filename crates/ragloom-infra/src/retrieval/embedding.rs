//! Text embeddings via the Gemini `embedContent` endpoint.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use ragloom_types::error::RetrievalError;

/// Converts text into an embedding vector.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait Embedder: Send + Sync {
    fn embed(
        &self,
        text: &str,
        api_key: &SecretString,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, RetrievalError>> + Send;
}

/// Gemini embedding client (`gemini-embedding-001`).
///
/// The key is passed per call; this type holds no credentials.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiEmbedder {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    const DEFAULT_MODEL: &'static str = "gemini-embedding-001";

    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}:embedContent", self.base_url, self.model)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EmbedRequest<'a> {
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

fn parse_embedding(body: &str) -> Result<Vec<f32>, RetrievalError> {
    let parsed: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| RetrievalError::Embedding(format!("failed to parse response: {e}")))?;
    parsed
        .embedding
        .map(|e| e.values)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RetrievalError::Embedding("response carried no embedding values".to_string()))
}

impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str, api_key: &SecretString) -> Result<Vec<f32>, RetrievalError> {
        let body = EmbedRequest {
            content: Content {
                parts: [Part { text }],
            },
        };

        let response = self
            .client
            .post(self.url())
            .header("X-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RetrievalError::Embedding(format!("HTTP {status}: {text}")));
        }
        parse_embedding(&text)
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
