//! Web search for LlmEngine nodes with `useWebSearch`.
//!
//! SerpAPI is tried first, Brave second. Any failure degrades to an empty
//! result; web search never fails a generation.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use ragloom_types::config::WebSearchConfig;

/// Number of results requested from each provider.
const RESULT_COUNT: usize = 5;

/// Search results rendered as prompt context plus their links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebContext {
    pub context: String,
    pub sources: Vec<String>,
}

impl WebContext {
    fn from_results<'a>(results: impl Iterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let mut out = WebContext::default();
        for (title, snippet, link) in results {
            out.context.push_str(&format!("{title}: {snippet}\n\n"));
            out.sources.push(link.to_string());
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.sources.is_empty()
    }
}

pub struct WebSearcher {
    client: reqwest::Client,
    serpapi_key: Option<SecretString>,
    brave_key: Option<SecretString>,
    serpapi_url: String,
    brave_url: String,
}

impl WebSearcher {
    pub fn new(client: reqwest::Client, config: &WebSearchConfig) -> Self {
        let secret = |key: &Option<String>| {
            key.as_ref()
                .filter(|k| !k.is_empty())
                .map(|k| SecretString::from(k.clone()))
        };
        Self {
            client,
            serpapi_key: secret(&config.serpapi_key),
            brave_key: secret(&config.brave_api_key),
            serpapi_url: "https://serpapi.com/search".to_string(),
            brave_url: "https://api.search.brave.com/res/v1/web/search".to_string(),
        }
    }

    /// Whether any provider key is configured.
    pub fn is_configured(&self) -> bool {
        self.serpapi_key.is_some() || self.brave_key.is_some()
    }

    pub async fn search(&self, query: &str) -> WebContext {
        if let Some(key) = &self.serpapi_key {
            match self.search_serpapi(query, key).await {
                Ok(ctx) if !ctx.is_empty() => return ctx,
                Ok(_) => tracing::debug!("SerpAPI returned no results"),
                Err(e) => tracing::warn!(error = %e, "SerpAPI search failed"),
            }
        }

        if let Some(key) = &self.brave_key {
            match self.search_brave(query, key).await {
                Ok(ctx) if !ctx.is_empty() => return ctx,
                Ok(_) => tracing::debug!("Brave returned no results"),
                Err(e) => tracing::warn!(error = %e, "Brave search failed"),
            }
        }

        WebContext::default()
    }

    async fn search_serpapi(&self, query: &str, key: &SecretString) -> Result<WebContext, String> {
        let count = RESULT_COUNT.to_string();
        let response = self
            .client
            .get(&self.serpapi_url)
            .query(&[
                ("q", query),
                ("api_key", key.expose_secret()),
                ("engine", "google"),
                ("num", count.as_str()),
            ])
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        let body = response.text().await.map_err(|e| e.to_string())?;
        parse_serpapi(&body)
    }

    async fn search_brave(&self, query: &str, key: &SecretString) -> Result<WebContext, String> {
        let count = RESULT_COUNT.to_string();
        let response = self
            .client
            .get(&self.brave_url)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", key.expose_secret())
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        let body = response.text().await.map_err(|e| e.to_string())?;
        parse_brave(&body)
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<SerpApiResult>,
}

#[derive(Deserialize)]
struct SerpApiResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
}

fn parse_serpapi(body: &str) -> Result<WebContext, String> {
    let parsed: SerpApiResponse = serde_json::from_str(body).map_err(|e| e.to_string())?;
    Ok(WebContext::from_results(
        parsed
            .organic_results
            .iter()
            .take(RESULT_COUNT)
            .map(|r| (r.title.as_str(), r.snippet.as_str(), r.link.as_str())),
    ))
}

fn parse_brave(body: &str) -> Result<WebContext, String> {
    let parsed: BraveResponse = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let results = parsed.web.map(|w| w.results).unwrap_or_default();
    Ok(WebContext::from_results(
        results
            .iter()
            .map(|r| (r.title.as_str(), r.description.as_str(), r.url.as_str())),
    ))
}
