// src/pipeline/mod.rs
// Batch orchestrator. One batch walks Validating → Fetching →
// ProcessingItems → Completed; a precondition failure aborts instead.
//
// Items are processed strictly sequentially in fetch order. Every per-item
// step returns a tagged result that is folded into that item's outcome, so
// one bad article can never abort the batch.

pub mod mapper;

use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PublisherConfig;
use crate::error::{BatchAbort, ItemError};
use crate::gnews::{ArticleSource, GNewsClient, SourceArticle};
use crate::images::{ImageProcessor, ImageTransformer};
use crate::strapi::{AssetReference, ContentSink, StrapiClient};

pub const MAX_ARTICLES_LIMIT: u32 = 100;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("publish_batches_total", "Batches run to completion.");
        describe_counter!(
            "publish_articles_total",
            "Articles successfully published to the CMS."
        );
        describe_counter!(
            "publish_item_failures_total",
            "Per-item failures recorded in batch outcomes."
        );
        describe_counter!(
            "publish_images_processed_total",
            "Images re-encoded and uploaded as CMS assets."
        );
    });
}

/// Validated invocation input for one batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub query: String,
    pub max_articles: u32,
    pub process_images: bool,
}

impl BatchRequest {
    /// `max_articles` is clamped to the caller contract of 1..=100.
    pub fn new(query: impl Into<String>, max_articles: u32, process_images: bool) -> Self {
        Self {
            query: query.into(),
            max_articles: max_articles.clamp(1, MAX_ARTICLES_LIMIT),
            process_images,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Published,
    Failed { reason: String },
}

/// One per source item, appended in fetch order, never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub title: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// A non-fatal image-step failure for an item that still got published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_warning: Option<String>,
}

impl ItemOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, OutcomeStatus::Published)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Published => None,
            OutcomeStatus::Failed { reason } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub total_fetched: usize,
    pub published: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_images: Option<usize>,
    pub outcomes: Vec<ItemOutcome>,
    pub message: String,
}

pub struct Publisher {
    config: PublisherConfig,
    source: Arc<dyn ArticleSource>,
    sink: Arc<dyn ContentSink>,
    images: Arc<dyn ImageProcessor>,
}

impl Publisher {
    pub fn new(
        config: PublisherConfig,
        source: Arc<dyn ArticleSource>,
        sink: Arc<dyn ContentSink>,
        images: Arc<dyn ImageProcessor>,
    ) -> Self {
        Self {
            config,
            source,
            sink,
            images,
        }
    }

    /// Wire up the live collaborators. Fails fast when the configuration is
    /// incomplete, with the same message `run` would abort with.
    pub fn from_config(config: &PublisherConfig) -> Result<Self, BatchAbort> {
        let v = config.validate()?;
        let source = Arc::new(GNewsClient::new(v.gnews_api_key.to_string()));
        let sink = Arc::new(StrapiClient::new(
            v.strapi_url.to_string(),
            v.strapi_token.to_string(),
        ));
        Ok(Self::new(
            config.clone(),
            source,
            sink,
            Arc::new(ImageTransformer::default()),
        ))
    }

    /// Run one batch to completion. Only configuration or fetch problems
    /// abort; everything after the fetch is absorbed into item outcomes.
    pub async fn run(&self, request: &BatchRequest) -> Result<BatchResult, BatchAbort> {
        ensure_metrics_described();

        // Validating: no network call happens before this passes.
        self.config.validate()?;

        info!(
            query = %request.query,
            max_articles = request.max_articles,
            process_images = request.process_images,
            "starting publish batch"
        );

        // Fetching: a non-success here is fatal to the whole batch.
        let articles = self
            .source
            .search(&request.query, request.max_articles)
            .await
            .map_err(|e| BatchAbort::Fetch(e.to_string()))?;

        // ProcessingItems
        let mut outcomes: Vec<ItemOutcome> = Vec::with_capacity(articles.len());
        let mut processed_images = 0usize;
        for article in &articles {
            let outcome = self.process_item(article, request, &mut processed_images).await;
            match &outcome.status {
                OutcomeStatus::Published => {
                    counter!("publish_articles_total").increment(1);
                    info!(title = %outcome.title, "published article");
                }
                OutcomeStatus::Failed { reason } => {
                    counter!("publish_item_failures_total").increment(1);
                    warn!(title = %outcome.title, reason = %reason, "article failed");
                }
            }
            outcomes.push(outcome);
        }

        // Completed
        let published = outcomes.iter().filter(|o| o.succeeded()).count();
        let message = summary_line(published, articles.len(), request.process_images, processed_images);
        counter!("publish_batches_total").increment(1);
        info!(published, total = articles.len(), "publish batch completed");

        Ok(BatchResult {
            total_fetched: articles.len(),
            published,
            processed_images: request.process_images.then_some(processed_images),
            outcomes,
            message,
        })
    }

    async fn process_item(
        &self,
        article: &SourceArticle,
        request: &BatchRequest,
        processed_images: &mut usize,
    ) -> ItemOutcome {
        let mut asset: Option<AssetReference> = None;
        let mut image_warning = None;

        // Image sub-pipeline: only when requested and the article carries an
        // image reference. A failure here downgrades to a warning; the item
        // is still published without an image.
        if request.process_images {
            if let Some(image_url) = article.image.as_deref() {
                match self.process_image(image_url, &article.title).await {
                    Ok(reference) => {
                        asset = Some(reference);
                        *processed_images += 1;
                        counter!("publish_images_processed_total").increment(1);
                    }
                    Err(e) => {
                        image_warning = Some(format!(
                            "Image processing failed for \"{}\": {}",
                            article.title, e
                        ));
                    }
                }
            }
        }

        let record = mapper::map_record(article, asset, request.process_images, &request.query);
        let status = match self.sink.create_record(&record).await {
            Ok(()) => OutcomeStatus::Published,
            Err(e) => OutcomeStatus::Failed {
                reason: format!("Failed to publish \"{}\": {}", article.title, e),
            },
        };

        ItemOutcome {
            title: article.title.clone(),
            status,
            image_warning,
        }
    }

    async fn process_image(
        &self,
        image_url: &str,
        article_title: &str,
    ) -> Result<AssetReference, ItemError> {
        let artifact = self.images.process(image_url, article_title).await?;
        self.sink.upload_asset(&artifact).await
    }
}

fn summary_line(
    published: usize,
    total: usize,
    process_images: bool,
    processed_images: usize,
) -> String {
    let suffix = if process_images {
        format!(" with {processed_images} images processed")
    } else {
        String::new()
    };
    format!("Successfully published {published} out of {total} articles{suffix}")
}
