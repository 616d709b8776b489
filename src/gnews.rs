// src/gnews.rs
// GNews search client. The pipeline only sees the `ArticleSource` trait so
// tests can feed it fixture batches instead of live HTTP.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

const GNEWS_SEARCH_URL: &str = "https://gnews.io/api/v4/search";

/// One article as fetched from the source API. Immutable for the duration of
/// a batch.
#[derive(Debug, Clone)]
pub struct SourceArticle {
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
    pub source_url: String,
}

#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch up to `max_articles` candidates for `query`. A non-success
    /// response is an error; the caller treats it as fatal for the batch.
    async fn search(&self, query: &str, max_articles: u32) -> Result<Vec<SourceArticle>>;
    fn name(&self) -> &'static str;
}

// ---- wire format ----

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[allow(dead_code)]
    #[serde(rename = "totalArticles", default)]
    total_articles: u64,
    articles: Vec<WireArticle>,
}

#[derive(Debug, Deserialize)]
struct WireArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: DateTime<Utc>,
    source: WireSource,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
}

impl From<WireArticle> for SourceArticle {
    fn from(w: WireArticle) -> Self {
        SourceArticle {
            title: w.title,
            description: w.description,
            content: w.content,
            url: w.url,
            // GNews sometimes sends an empty string instead of null
            image: w.image.filter(|u| !u.is_empty()),
            published_at: w.published_at,
            source_name: w.source.name,
            source_url: w.source.url,
        }
    }
}

pub struct GNewsClient {
    client: Client,
    api_key: String,
}

impl GNewsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl ArticleSource for GNewsClient {
    async fn search(&self, query: &str, max_articles: u32) -> Result<Vec<SourceArticle>> {
        let resp = self
            .client
            .get(GNEWS_SEARCH_URL)
            .query(&[
                ("q", query),
                ("lang", "en"),
                ("country", "us"),
                ("max", &max_articles.to_string()),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GNews API error: {}", status.as_u16()));
        }

        let body: SearchResponse = resp.json().await?;
        tracing::debug!(
            query,
            fetched = body.articles.len(),
            "gnews search completed"
        );
        Ok(body.articles.into_iter().map(SourceArticle::from).collect())
    }

    fn name(&self) -> &'static str {
        "GNews"
    }
}
