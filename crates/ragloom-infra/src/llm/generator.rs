//! `GenerationService` implementation routing on the model id.

use ragloom_core::llm::GenerationService;
use ragloom_types::config::{LlmConfig, WebSearchConfig};
use ragloom_types::error::GenerationError;
use ragloom_types::llm::{Generation, GenerationRequest};

use super::gemini::GeminiClient;
use super::openai::OpenAiClient;
use super::prompt::build_system_prompt;
use super::web_search::{WebContext, WebSearcher};
use super::CompletionParams;

/// Provider family selected from the model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl Provider {
    /// `gpt*` → OpenAI, `gemini*` → Gemini.
    pub fn for_model(model: &str) -> Option<Self> {
        if model.starts_with("gpt") {
            Some(Self::OpenAi)
        } else if model.starts_with("gemini") {
            Some(Self::Gemini)
        } else {
            None
        }
    }
}

pub struct LlmGenerator {
    openai: OpenAiClient,
    gemini: GeminiClient,
    web: WebSearcher,
    params: CompletionParams,
}

impl LlmGenerator {
    pub fn new(client: reqwest::Client, llm: &LlmConfig, web_search: &WebSearchConfig) -> Self {
        Self {
            openai: OpenAiClient::new(client.clone()),
            gemini: GeminiClient::new(client.clone()),
            web: WebSearcher::new(client, web_search),
            params: CompletionParams::from(llm),
        }
    }
}

impl GenerationService for LlmGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let provider = Provider::for_model(&request.model)
            .ok_or_else(|| GenerationError::UnsupportedModel(request.model.clone()))?;
        let api_key = request
            .api_key
            .as_ref()
            .ok_or_else(|| GenerationError::MissingCredential {
                model: request.model.clone(),
            })?;

        let web = if request.use_web_search {
            self.web.search(&request.query).await
        } else {
            WebContext::default()
        };

        let system_prompt = build_system_prompt(
            request.custom_prompt.as_deref(),
            request.context.as_deref(),
            Some(web.context.as_str()),
        );

        tracing::debug!(model = %request.model, web_sources = web.sources.len(), "calling provider");
        let text = match provider {
            Provider::OpenAi => {
                self.openai
                    .complete(&system_prompt, &request.query, &request.model, api_key, self.params)
                    .await?
            }
            Provider::Gemini => {
                self.gemini
                    .complete(&system_prompt, &request.query, &request.model, api_key, self.params)
                    .await?
            }
        };

        Ok(Generation {
            text,
            sources: web.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn generator() -> LlmGenerator {
        LlmGenerator::new(
            reqwest::Client::new(),
            &LlmConfig::default(),
            &WebSearchConfig::default(),
        )
    }

    fn request(model: &str, key: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            query: "hello".to_string(),
            model: model.to_string(),
            context: None,
            custom_prompt: None,
            use_web_search: true,
            api_key: key.map(|k| SecretString::from(k.to_string())),
        }
    }

    #[test]
    fn provider_routing() {
        assert_eq!(Provider::for_model("gpt-4o-mini"), Some(Provider::OpenAi));
        assert_eq!(Provider::for_model("gemini-2.5-flash"), Some(Provider::Gemini));
        assert_eq!(Provider::for_model("claude-sonnet"), None);
        assert_eq!(Provider::for_model(""), None);
    }

    #[tokio::test]
    async fn unsupported_model_fails_before_any_call() {
        let err = generator().generate(&request("llama-3", Some("k"))).await.unwrap_err();
        assert!(matches!(err, GenerationError::UnsupportedModel(m) if m == "llama-3"));
    }

    #[tokio::test]
    async fn missing_key_is_missing_credential() {
        let err = generator().generate(&request("gpt-4o", None)).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredential { model } if model == "gpt-4o"));

        let err = generator().generate(&request("gemini-pro", None)).await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredential { .. }));
    }

    #[test]
    fn params_follow_config() {
        let llm = LlmConfig {
            max_tokens: 42,
            temperature: 0.1,
            timeout_secs: 10,
        };
        let generator = LlmGenerator::new(reqwest::Client::new(), &llm, &WebSearchConfig::default());
        assert_eq!(generator.params.max_tokens, 42);
        assert!((generator.params.temperature - 0.1).abs() < f32::EPSILON);
    }
}
