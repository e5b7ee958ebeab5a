/// Classification providers
///
/// A provider turns a tab's URL and title plus the list of categories into a
/// single label by calling an LLM API. Which backend is used is decided once,
/// when the [`Provider`] is built from the stored settings.

pub mod embedding;
pub mod gemini;
pub mod gpt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ProviderError;
use crate::storage::{KeyValueStore, Settings};
use crate::tab_data::ClassifyInput;

pub use embedding::{EmbeddingMatcher, OpenAiEmbeddings};
pub use gemini::GeminiProvider;
pub use gpt::GptProvider;

/// Stored under `serviceProvider`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceProvider {
    #[default]
    #[serde(rename = "GPT")]
    Gpt,
    #[serde(rename = "Gemini")]
    Gemini,
    /// Link preview embedding matched against category embeddings
    #[serde(rename = "Embedding")]
    Embedding,
}

impl ServiceProvider {
    pub const ALL: [ServiceProvider; 3] = [
        ServiceProvider::Gpt,
        ServiceProvider::Gemini,
        ServiceProvider::Embedding,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ServiceProvider::Gpt => "GPT",
            ServiceProvider::Gemini => "Gemini",
            ServiceProvider::Embedding => "Embedding",
        }
    }

    /// Backends that talk to an OpenAI-compatible server at `apiURL`
    pub fn uses_api_url(self) -> bool {
        matches!(self, ServiceProvider::Gpt | ServiceProvider::Embedding)
    }
}

/// Anything that can pick a category for a tab
#[allow(async_fn_in_trait)]
pub trait Classify {
    /// Raw provider answer; not yet checked against `categories`
    async fn classify(
        &self,
        tab: &ClassifyInput,
        categories: &[String],
        api_key: &str,
    ) -> Result<String, ProviderError>;
}

/// The configured backend. `S` holds the embedding caches.
pub enum Provider<S> {
    Gpt(GptProvider),
    Gemini(GeminiProvider),
    Embedding(EmbeddingMatcher<OpenAiEmbeddings, S>),
}

impl<S: KeyValueStore> Provider<S> {
    pub fn from_settings(client: reqwest::Client, store: S, settings: &Settings) -> Provider<S> {
        match settings.service_provider {
            ServiceProvider::Gpt => Provider::Gpt(GptProvider::new(client, settings)),
            ServiceProvider::Gemini => Provider::Gemini(GeminiProvider::new(client, settings)),
            ServiceProvider::Embedding => {
                Provider::Embedding(EmbeddingMatcher::new(OpenAiEmbeddings::new(client, settings), store))
            }
        }
    }
}

impl<S: KeyValueStore> Classify for Provider<S> {
    async fn classify(
        &self,
        tab: &ClassifyInput,
        categories: &[String],
        api_key: &str,
    ) -> Result<String, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::MissingKey);
        }
        match self {
            Provider::Gpt(p) => p.classify(tab, categories, api_key).await,
            Provider::Gemini(p) => p.classify(tab, categories, api_key).await,
            Provider::Embedding(p) => p.classify(tab, categories, api_key).await,
        }
    }
}

/// Builds the configured provider. Settings are re-read for every event, so
/// switching backends in the options page applies to the next tab.
pub trait ProviderFactory {
    type Output: Classify;

    fn build(&self, settings: &Settings) -> Self::Output;
}

/// Real HTTP backends sharing one client
#[derive(Clone)]
pub struct HttpProviders<S> {
    client: reqwest::Client,
    store: S,
}

impl<S> HttpProviders<S> {
    pub fn new(client: reqwest::Client, store: S) -> HttpProviders<S> {
        HttpProviders { client, store }
    }
}

impl<S: KeyValueStore + Clone> ProviderFactory for HttpProviders<S> {
    type Output = Provider<S>;

    fn build(&self, settings: &Settings) -> Provider<S> {
        Provider::from_settings(self.client.clone(), self.store.clone(), settings)
    }
}

/// How a provider answer is compared with the category list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Byte-for-byte equality; anything else is dropped
    #[default]
    Exact,
    /// Trim whitespace, quotes and trailing punctuation, ignore case
    Lenient,
}

/// Map a provider answer onto one of `categories`
pub fn resolve_category(response: &str, categories: &[String], mode: MatchMode) -> Option<String> {
    match mode {
        MatchMode::Exact => categories.iter().find(|c| c.as_str() == response).cloned(),
        MatchMode::Lenient => {
            let cleaned = response
                .trim()
                .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
                .trim_end_matches(|c: char| c == '.' || c == '!' || c == ',')
                .trim();
            categories
                .iter()
                .find(|c| c.eq_ignore_ascii_case(cleaned))
                .cloned()
        }
    }
}

/// Result of checking an API key from the popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCheck {
    Valid,
    /// Could not tell, e.g. the endpoint does not list models
    Unverified(String),
    Invalid(String),
}

/// Cheap authenticated request that does not spend tokens
pub async fn validate_api_key(client: &reqwest::Client, settings: &Settings, api_key: &str) -> KeyCheck {
    if api_key.is_empty() {
        return KeyCheck::Invalid("API key is empty".to_string());
    }

    let request = match settings.service_provider {
        ServiceProvider::Gpt | ServiceProvider::Embedding => match models_url(settings.chat_api_url()) {
            Some(url) => client.get(url).bearer_auth(api_key),
            None => return KeyCheck::Invalid(format!("invalid API URL: {}", settings.chat_api_url())),
        },
        ServiceProvider::Gemini => client.get(format!("{}?key={}", gemini::MODELS_URL, api_key)),
    };

    match request.send().await {
        Ok(response) => key_check_from_status(response.status().as_u16()),
        Err(e) => KeyCheck::Unverified(format!("could not reach provider: {}", e)),
    }
}

fn key_check_from_status(status: u16) -> KeyCheck {
    match status {
        200..=299 => KeyCheck::Valid,
        400 | 401 | 403 => KeyCheck::Invalid(format!("provider rejected the key (HTTP {})", status)),
        other => KeyCheck::Unverified(format!("provider answered HTTP {}", other)),
    }
}

/// `<origin of apiURL>/v1/<path>`; OpenAI-compatible servers share the origin
pub(crate) fn sibling_endpoint(api_url: &str, path: &str) -> Option<String> {
    let url = Url::parse(api_url).ok()?;
    if !url.has_host() {
        return None;
    }
    Some(format!("{}/v1/{}", url.origin().ascii_serialization(), path))
}

fn models_url(api_url: &str) -> Option<String> {
    sibling_endpoint(api_url, "models")
}
