/// Embedding-based matcher
///
/// Instead of asking a chat model, fetch a link preview for the tab's host,
/// embed it, and pick the category whose own embedding is most similar.
/// Both kinds of embedding are cached in storage forever: per hostname under
/// `embedding-<hostname>` and per category under `embedding-group-v4-<name>`.

use serde::{Deserialize, Serialize};

use super::Classify;
use crate::domain::extract_hostname;
use crate::error::ProviderError;
use crate::storage::{self, KeyValueStore, Settings};
use crate::tab_data::ClassifyInput;

pub const LINK_PREVIEW_URL: &str = "https://affine-worker.toeverything.workers.dev/api/worker/link-preview";
pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Returned when no category scores above zero
pub const UNKNOWN_CATEGORY: &str = "Unknown";

pub fn domain_cache_key(hostname: &str) -> String {
    format!("embedding-{}", hostname)
}

pub fn category_cache_key(name: &str) -> String {
    format!("embedding-group-v4-{}", name)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewData {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub favicons: Vec<String>,
}

impl PreviewData {
    /// Drop fields the preview service sent back empty
    fn compact(mut self) -> PreviewData {
        for field in [&mut self.title, &mut self.site_name, &mut self.description] {
            if field.as_deref().is_some_and(str::is_empty) {
                *field = None;
            }
        }
        self
    }

    /// Text that gets embedded: url, site name, title, description
    pub fn embedding_text(&self) -> String {
        [
            Some(self.url.as_str()),
            self.site_name.as_deref(),
            self.title.as_deref(),
            self.description.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub preview: PreviewData,
    pub embedding: Vec<f64>,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEmbeddingData {
    #[serde(rename = "type")]
    pub category: String,
    pub embedding: Vec<f64>,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainMatch {
    pub url: String,
    pub category: String,
    pub similarity: f64,
    pub preview: PreviewData,
}

/// A category name with the description that gets embedded alongside it
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDescription {
    pub name: String,
    pub desc: String,
}

/// W3C manifest categories
pub fn default_categories() -> Vec<CategoryDescription> {
    [
        ("Books", "A collection of books and literature resources."),
        ("Business", "Resources related to business operations and finance."),
        ("Education", "Educational resources and learning materials."),
        ("Entertainment", "Entertainment resources including movies, music, and TV shows."),
        ("Finance", "Financial resources including banking, investing, and personal finance."),
        ("Fitness", "Fitness resources including workout routines and health tips."),
        ("Food", "Food resources including recipes, cooking tips, and nutrition information."),
        ("Games", "Gaming resources including video games, board games."),
        ("Government", "Government resources including legal documents and public services."),
        ("Health", "Health resources including medical information and wellness tips."),
        ("Kids", "Resources for kids including educational games and child-friendly entertainment."),
        ("Lifestyle", "Lifestyle resources including fashion, home decor, and personal growth."),
        ("Magazines", "Magazines and periodicals covering a variety of topics."),
        ("Medical", "Medical resources including health guides and medical research."),
        ("Music", "Music resources including songs, albums."),
        ("Navigation", "Navigation resources including maps and travel guides."),
        ("News", "News resources including current events and journalism."),
        ("Personalization", "Resources for personalizing your digital experience."),
        ("Productivity", "Resources focused on enhancing efficiency and productivity, including tools for task management, note-taking, and time tracking."),
        ("Shopping", "Shopping resources including product reviews and deal alerts."),
        ("Social", "Social resources including social networking apps and communication tools."),
        ("Sports", "Sports resources including news, scores, and team information."),
        ("Travel", "Travel resources including guides, booking tools, and travel tips."),
        ("Weather", "Weather resources including forecasts, alerts, and climate information."),
    ]
    .into_iter()
    .map(|(name, desc)| CategoryDescription {
        name: name.to_string(),
        desc: desc.to_string(),
    })
    .collect()
}

/// Network side of the matcher
#[allow(async_fn_in_trait)]
pub trait EmbeddingApi {
    /// `Ok(None)` when the preview service does not answer 200
    async fn link_preview(&self, url: &str) -> Result<Option<PreviewData>, ProviderError>;

    async fn embed(&self, api_key: &str, text: &str) -> Result<Vec<f64>, ProviderError>;
}

impl<T: EmbeddingApi + ?Sized> EmbeddingApi for &T {
    async fn link_preview(&self, url: &str) -> Result<Option<PreviewData>, ProviderError> {
        (**self).link_preview(url).await
    }

    async fn embed(&self, api_key: &str, text: &str) -> Result<Vec<f64>, ProviderError> {
        (**self).embed(api_key, text).await
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResult {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f64>,
}

pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    embed_url: String,
}

impl OpenAiEmbeddings {
    pub fn new(client: reqwest::Client, settings: &Settings) -> OpenAiEmbeddings {
        let embed_url = super::sibling_endpoint(settings.chat_api_url(), "embeddings")
            .unwrap_or_else(|| DEFAULT_EMBEDDINGS_URL.to_string());
        OpenAiEmbeddings { client, embed_url }
    }
}

impl EmbeddingApi for OpenAiEmbeddings {
    async fn link_preview(&self, url: &str) -> Result<Option<PreviewData>, ProviderError> {
        let response = self
            .client
            .post(LINK_PREVIEW_URL)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;

        if response.status().as_u16() != 200 {
            log::debug!("link preview for {} answered {}", url, response.status());
            return Ok(None);
        }

        let preview: PreviewData = response.json().await?;
        Ok(Some(preview.compact()))
    }

    async fn embed(&self, api_key: &str, text: &str) -> Result<Vec<f64>, ProviderError> {
        let response = self
            .client
            .post(&self.embed_url)
            .bearer_auth(api_key)
            .json(&EmbeddingRequest {
                input: text,
                model: EMBEDDING_MODEL,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let result: EmbeddingResult = response.json().await?;
        result
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| ProviderError::Malformed("empty embedding list".to_string()))
    }
}

/// Cosine similarity; 0 for empty, mismatched or zero vectors
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Milliseconds since the epoch
pub fn now_millis() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or_default()
    }
}

pub struct EmbeddingMatcher<A, S> {
    api: A,
    store: S,
    descriptions: Vec<CategoryDescription>,
}

impl<A: EmbeddingApi, S: KeyValueStore> EmbeddingMatcher<A, S> {
    pub fn new(api: A, store: S) -> Self {
        EmbeddingMatcher {
            api,
            store,
            descriptions: default_categories(),
        }
    }

    fn description_of(&self, name: &str) -> String {
        self.descriptions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.desc.clone())
            .unwrap_or_default()
    }

    /// Preview + embedding for the URL's host, from cache when present
    pub async fn domain_embedding(
        &self,
        api_key: &str,
        url: &str,
    ) -> Result<Option<EmbeddingData>, ProviderError> {
        let Some(hostname) = extract_hostname(url) else {
            return Ok(None);
        };
        let cache_key = domain_cache_key(&hostname);

        if let Some(cached) = self.cached::<EmbeddingData>(&cache_key).await {
            return Ok(Some(cached));
        }

        let Some(preview) = self.api.link_preview(&hostname).await? else {
            return Ok(None);
        };
        let embedding = self.api.embed(api_key, &preview.embedding_text()).await?;
        let data = EmbeddingData {
            preview,
            embedding,
            timestamp: now_millis(),
        };

        self.store_cache(&cache_key, &data).await;
        Ok(Some(data))
    }

    pub async fn category_embedding(
        &self,
        api_key: &str,
        name: &str,
    ) -> Result<GroupEmbeddingData, ProviderError> {
        let cache_key = category_cache_key(name);

        if let Some(cached) = self.cached::<GroupEmbeddingData>(&cache_key).await {
            return Ok(cached);
        }

        let text = format!("{}\n{}", name, self.description_of(name));
        let data = GroupEmbeddingData {
            category: name.to_string(),
            embedding: self.api.embed(api_key, &text).await?,
            timestamp: now_millis(),
        };

        self.store_cache(&cache_key, &data).await;
        Ok(data)
    }

    /// Best-scoring category for the URL's host among `categories`
    pub async fn domain_matched_type(
        &self,
        api_key: &str,
        url: &str,
        categories: &[String],
    ) -> Result<Option<DomainMatch>, ProviderError> {
        if api_key.is_empty() {
            return Err(ProviderError::MissingKey);
        }
        let Some(domain) = self.domain_embedding(api_key, url).await? else {
            return Ok(None);
        };

        let mut best = DomainMatch {
            url: url.to_string(),
            category: UNKNOWN_CATEGORY.to_string(),
            similarity: 0.0,
            preview: domain.preview.clone(),
        };

        for name in categories {
            let group = match self.category_embedding(api_key, name).await {
                Ok(group) => group,
                Err(e) => {
                    log::error!("no embedding for category {}: {}", name, e);
                    continue;
                }
            };
            let similarity = cosine_similarity(&group.embedding, &domain.embedding);
            if similarity > best.similarity {
                best.similarity = similarity;
                best.category = group.category;
            }
        }

        Ok(Some(best))
    }

    async fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match storage::get_as(&self.store, key).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    async fn store_cache<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = storage::set_as(&self.store, key, value).await {
            log::warn!("could not cache {}: {}", key, e);
        }
    }
}

impl<A: EmbeddingApi, S: KeyValueStore> Classify for EmbeddingMatcher<A, S> {
    async fn classify(
        &self,
        tab: &ClassifyInput,
        categories: &[String],
        api_key: &str,
    ) -> Result<String, ProviderError> {
        match self.domain_matched_type(api_key, &tab.url, categories).await? {
            Some(found) => Ok(found.category),
            None => Err(ProviderError::Malformed(format!("no preview for {}", tab.url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use futures::executor::block_on;
    use std::cell::RefCell;

    /// Embeds by keyword so that similarities are predictable
    #[derive(Default)]
    struct KeywordApi {
        preview_calls: RefCell<usize>,
        embed_calls: RefCell<Vec<String>>,
    }

    impl EmbeddingApi for KeywordApi {
        async fn link_preview(&self, url: &str) -> Result<Option<PreviewData>, ProviderError> {
            *self.preview_calls.borrow_mut() += 1;
            if url.contains("offline") {
                return Ok(None);
            }
            Ok(Some(PreviewData {
                url: url.to_string(),
                title: Some("Breaking news today".to_string()),
                site_name: Some(String::new()),
                ..PreviewData::default()
            }))
        }

        async fn embed(&self, _api_key: &str, text: &str) -> Result<Vec<f64>, ProviderError> {
            self.embed_calls.borrow_mut().push(text.to_string());
            let lower = text.to_lowercase();
            Ok(vec![
                if lower.contains("news") { 1.0 } else { 0.0 },
                if lower.contains("game") { 1.0 } else { 0.0 },
                0.1,
            ])
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_embedding_text_skips_empty_fields() {
        let preview = PreviewData {
            url: "bbc.co.uk".to_string(),
            title: Some("BBC".to_string()),
            site_name: Some(String::new()),
            ..PreviewData::default()
        }
        .compact();

        assert_eq!(preview.site_name, None);
        assert_eq!(preview.embedding_text(), "bbc.co.uk\nBBC");
    }

    #[test]
    fn test_domain_embedding_cache_hit_makes_no_calls() {
        let api = KeywordApi::default();
        let store = MemoryStore::default();
        let matcher = EmbeddingMatcher::new(&api, &store);

        let first = block_on(matcher.domain_embedding("k", "https://www.bbc.co.uk/news")).unwrap().unwrap();
        let calls_after_first = (*api.preview_calls.borrow(), api.embed_calls.borrow().len());
        let second = block_on(matcher.domain_embedding("k", "https://www.bbc.co.uk/sport")).unwrap().unwrap();

        assert_eq!(calls_after_first, (1, 1));
        assert_eq!(*api.preview_calls.borrow(), 1);
        assert_eq!(api.embed_calls.borrow().len(), 1);
        assert_eq!(first.embedding, second.embedding);
        assert!(store.value("embedding-www.bbc.co.uk").is_some());
    }

    #[test]
    fn test_no_preview_is_not_cached() {
        let api = KeywordApi::default();
        let store = MemoryStore::default();
        let matcher = EmbeddingMatcher::new(&api, &store);

        let result = block_on(matcher.domain_embedding("k", "https://offline.example")).unwrap();

        assert!(result.is_none());
        assert!(store.value("embedding-offline.example").is_none());
    }

    #[test]
    fn test_category_embedding_uses_description_and_cache() {
        let api = KeywordApi::default();
        let store = MemoryStore::default();
        let matcher = EmbeddingMatcher::new(&api, &store);

        block_on(matcher.category_embedding("k", "News")).unwrap();
        block_on(matcher.category_embedding("k", "News")).unwrap();

        let calls = api.embed_calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], "News\nNews resources including current events and journalism.");
        assert!(store.value("embedding-group-v4-News").is_some());
    }

    #[test]
    fn test_domain_matched_type_picks_most_similar() {
        let api = KeywordApi::default();
        let store = MemoryStore::default();
        let matcher = EmbeddingMatcher::new(&api, &store);
        let categories = vec!["Games".to_string(), "News".to_string()];

        let found = block_on(matcher.domain_matched_type("k", "https://www.bbc.co.uk", &categories))
            .unwrap()
            .unwrap();

        assert_eq!(found.category, "News");
        assert!(found.similarity > 0.9);
    }

    #[test]
    fn test_classify_requires_key() {
        let api = KeywordApi::default();
        let store = MemoryStore::default();
        let matcher = EmbeddingMatcher::new(&api, &store);
        let tab = ClassifyInput {
            url: "https://www.bbc.co.uk".to_string(),
            title: String::new(),
        };

        let result = block_on(matcher.classify(&tab, &["News".to_string()], ""));

        assert!(matches!(result, Err(ProviderError::MissingKey)));
        assert_eq!(*api.preview_calls.borrow(), 0);
    }
}
