//! Infrastructure layer for Ragloom.
//!
//! Contains implementations of the ports defined in `ragloom-core`: SQLite
//! storage, document retrieval with optional Gemini embeddings, and the
//! OpenAI/Gemini generation backends with web search.

pub mod config;
pub mod llm;
pub mod retrieval;
pub mod sqlite;

use std::time::Duration;

/// Shared HTTP client for provider, embedding and search calls.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}
