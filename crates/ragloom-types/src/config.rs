//! Global configuration types for Ragloom.
//!
//! `GlobalConfig` represents the top-level `config.toml` in the data
//! directory. Every section and field has a default, so an empty or missing
//! file yields a working configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.ragloom/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Document chunking and search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passages returned per KnowledgeBase node.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Run the nodes of one ready batch concurrently.
    #[serde(default)]
    pub concurrent_batches: bool,
}

/// Web search provider keys. Never serialized back out.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default, skip_serializing)]
    pub serpapi_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub brave_api_key: Option<String>,
}

impl fmt::Debug for WebSearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("WebSearchConfig")
            .field("serpapi_key", &redact(&self.serpapi_key))
            .field("brave_api_key", &redact(&self.brave_api_key))
            .finish()
    }
}

/// Chat completion parameters shared by every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// HTTP timeout for provider, embedding and search calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.chunk_size, 1000);
        assert_eq!(config.retrieval.chunk_overlap, 200);
        assert!(!config.engine.concurrent_batches);
        assert_eq!(config.llm.max_tokens, 1500);
        assert_eq!(config.llm.timeout_secs, 300);
        assert!(config.web_search.serpapi_key.is_none());
    }

    #[test]
    fn test_global_config_deserialize_empty() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_global_config_deserialize_partial_sections() {
        let toml_str = r#"
[retrieval]
top_k = 8

[engine]
concurrent_batches = true

[web_search]
brave_api_key = "brave-123"
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.chunk_size, 1000);
        assert!(config.engine.concurrent_batches);
        assert_eq!(config.web_search.brave_api_key.as_deref(), Some("brave-123"));
        assert_eq!(config.llm.max_tokens, 1500);
    }

    #[test]
    fn test_web_search_keys_redacted() {
        let config = WebSearchConfig {
            serpapi_key: Some("serp-secret".to_string()),
            brave_api_key: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("serp-secret"));
        assert!(debug.contains("REDACTED"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("serp-secret"));
    }
}
