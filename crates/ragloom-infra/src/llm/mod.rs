//! Generation backends.
//!
//! [`generator::LlmGenerator`] implements `GenerationService` from
//! `ragloom-core`: it routes by model id prefix to the OpenAI or Gemini
//! client, optionally enriching the prompt with web search results.

pub mod gemini;
pub mod generator;
pub mod openai;
pub mod prompt;
pub mod web_search;

use ragloom_types::config::LlmConfig;
use ragloom_types::error::GenerationError;

/// Sampling parameters shared by both providers.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&LlmConfig> for CompletionParams {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Read the body, mapping a non-2xx status to `ProviderStatus`.
async fn check_status(response: reqwest::Response) -> Result<String, GenerationError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GenerationError::Provider(format!("failed to read response: {e}")))?;
    if !status.is_success() {
        return Err(GenerationError::ProviderStatus {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(body)
}
