//! Request and response types for the retrieval and generation collaborators.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Question asked when no query reaches an LlmEngine node.
pub const DEFAULT_LLM_QUERY: &str = "What can you help me with?";

/// A retrieval call made on behalf of a KnowledgeBase node.
#[derive(Debug)]
pub struct RetrievalQuery {
    pub query: String,
    pub document_ids: Vec<i64>,
    /// Embedding API key; retrieval degrades to text search without one.
    pub api_key: Option<SecretString>,
    pub top_k: usize,
}

/// A generation call made on behalf of an LlmEngine node.
#[derive(Debug)]
pub struct GenerationRequest {
    pub query: String,
    /// Model id, e.g. `gpt-4o-mini` or `gemini-2.5-flash`.
    pub model: String,
    /// Document context assembled by an upstream KnowledgeBase node.
    pub context: Option<String>,
    /// Replaces the default system prompt when set.
    pub custom_prompt: Option<String>,
    pub use_web_search: bool,
    pub api_key: Option<SecretString>,
}

/// Generated text plus the web sources that informed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    #[serde(default)]
    pub sources: Vec<String>,
}
