// tests/pipeline_abort.rs
// Batch-level preconditions: missing configuration and fetch failures abort
// before any publishing happens.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;

use news_publisher::error::{BatchAbort, ItemError};
use news_publisher::gnews::{ArticleSource, SourceArticle};
use news_publisher::images::{ImageArtifact, ImageProcessor};
use news_publisher::pipeline::{BatchRequest, Publisher};
use news_publisher::strapi::{AssetReference, ContentRecord, ContentSink};
use news_publisher::PublisherConfig;

struct CountingSource {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ArticleSource for CountingSource {
    async fn search(&self, _query: &str, _max: u32) -> anyhow::Result<Vec<SourceArticle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("GNews API error: 500");
        }
        Ok(Vec::new())
    }
    fn name(&self) -> &'static str {
        "Counting"
    }
}

struct CountingSink {
    create_calls: AtomicUsize,
}

#[async_trait]
impl ContentSink for CountingSink {
    async fn create_record(&self, _record: &ContentRecord) -> Result<(), ItemError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    async fn upload_asset(&self, _artifact: &ImageArtifact) -> Result<AssetReference, ItemError> {
        Ok(AssetReference { id: 1 })
    }
}

struct NoopImager;

#[async_trait]
impl ImageProcessor for NoopImager {
    async fn process(&self, _url: &str, _title: &str) -> Result<ImageArtifact, ItemError> {
        Err(ItemError::ImageAcquisition("unused".to_string()))
    }
}

fn harness(config: PublisherConfig, fail_fetch: bool) -> (Publisher, Arc<CountingSource>, Arc<CountingSink>) {
    let source = Arc::new(CountingSource {
        calls: AtomicUsize::new(0),
        fail: fail_fetch,
    });
    let sink = Arc::new(CountingSink {
        create_calls: AtomicUsize::new(0),
    });
    let p = Publisher::new(config, source.clone(), sink.clone(), Arc::new(NoopImager));
    (p, source, sink)
}

#[tokio::test]
async fn missing_gnews_key_aborts_before_any_network_call() {
    let config = PublisherConfig {
        gnews_api_key: None,
        strapi_url: Some("http://localhost:1337".into()),
        strapi_token: Some("t".into()),
    };
    let (p, source, sink) = harness(config, false);

    let err = p
        .run(&BatchRequest::new("technology", 3, false))
        .await
        .unwrap_err();

    assert!(matches!(err, BatchAbort::MissingConfig(_)));
    assert_eq!(
        err.to_string(),
        "GNEWS_API_KEY environment variable is not configured"
    );
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    assert_eq!(sink.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_strapi_settings_abort_with_combined_message() {
    let config = PublisherConfig {
        gnews_api_key: Some("k".into()),
        strapi_url: None,
        strapi_token: None,
    };
    let (p, source, _sink) = harness(config, false);

    let err = p
        .run(&BatchRequest::new("technology", 3, false))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "STRAPI_URL or STRAPI_API_TOKEN environment variables are not configured"
    );
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn fetch_failure_aborts_without_publish_calls() {
    let config = PublisherConfig::new("k", "http://localhost:1337", "t");
    let (p, source, sink) = harness(config, true);

    let err = p
        .run(&BatchRequest::new("technology", 3, false))
        .await
        .unwrap_err();

    assert!(matches!(err, BatchAbort::Fetch(_)));
    assert_eq!(
        err.to_string(),
        "Failed to fetch or publish news: GNews API error: 500"
    );
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_fetch_completes_with_zero_counts() {
    let config = PublisherConfig::new("k", "http://localhost:1337", "t");
    let (p, _source, sink) = harness(config, false);

    let result = p
        .run(&BatchRequest::new("technology", 3, false))
        .await
        .unwrap();

    assert_eq!(result.total_fetched, 0);
    assert_eq!(result.published, 0);
    assert!(result.outcomes.is_empty());
    assert_eq!(sink.create_calls.load(Ordering::SeqCst), 0);
}
