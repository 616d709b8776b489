// tests/pipeline_outcomes.rs
// Per-item isolation and outcome accounting across a batch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use news_publisher::error::ItemError;
use news_publisher::gnews::{ArticleSource, SourceArticle};
use news_publisher::images::{ImageArtifact, ImageProcessor};
use news_publisher::pipeline::{BatchRequest, Publisher};
use news_publisher::strapi::{
    classify_publish_failure, AssetReference, ContentRecord, ContentSink,
};
use news_publisher::PublisherConfig;

fn article(title: &str, image: Option<&str>) -> SourceArticle {
    SourceArticle {
        title: title.to_string(),
        description: format!("{title} description"),
        content: format!("{title} content"),
        url: format!("https://news.example.test/{title}"),
        image: image.map(|u| u.to_string()),
        published_at: Utc::now(),
        source_name: "Example News".to_string(),
        source_url: "https://news.example.test".to_string(),
    }
}

struct FixtureSource {
    articles: Vec<SourceArticle>,
    calls: AtomicUsize,
}

impl FixtureSource {
    fn new(articles: Vec<SourceArticle>) -> Self {
        Self {
            articles,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ArticleSource for FixtureSource {
    async fn search(&self, _query: &str, _max: u32) -> anyhow::Result<Vec<SourceArticle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.articles.clone())
    }
    fn name(&self) -> &'static str {
        "Fixture"
    }
}

/// Records every submitted record; optionally rejects one index with a
/// canned classification.
struct RecordingSink {
    records: Mutex<Vec<ContentRecord>>,
    create_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    reject_index: Option<usize>,
    reject_reason: String,
    fail_uploads: bool,
}

impl RecordingSink {
    fn accepting() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            reject_index: None,
            reject_reason: String::new(),
            fail_uploads: false,
        }
    }

    fn rejecting(index: usize, reason: String) -> Self {
        Self {
            reject_index: Some(index),
            reject_reason: reason,
            ..Self::accepting()
        }
    }
}

#[async_trait]
impl ContentSink for RecordingSink {
    async fn create_record(&self, record: &ContentRecord) -> Result<(), ItemError> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(record.clone());
        if self.reject_index == Some(call) {
            return Err(ItemError::RecordPublish(self.reject_reason.clone()));
        }
        Ok(())
    }

    async fn upload_asset(&self, _artifact: &ImageArtifact) -> Result<AssetReference, ItemError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads {
            return Err(ItemError::ImageUpload("Upload failed: disk full".to_string()));
        }
        Ok(AssetReference { id: 42 })
    }
}

struct OkImager;

#[async_trait]
impl ImageProcessor for OkImager {
    async fn process(&self, url: &str, title: &str) -> Result<ImageArtifact, ItemError> {
        Ok(ImageArtifact {
            source_ref: url.to_string(),
            encoded_bytes: vec![0xFF, 0xD8],
            mime_type: "image/jpeg".to_string(),
            generated_name: format!("{title}.jpg"),
        })
    }
}

struct FailingImager;

#[async_trait]
impl ImageProcessor for FailingImager {
    async fn process(&self, _url: &str, _title: &str) -> Result<ImageArtifact, ItemError> {
        Err(ItemError::ImageAcquisition(
            "Failed to download image: 403".to_string(),
        ))
    }
}

fn publisher(
    source: Arc<FixtureSource>,
    sink: Arc<RecordingSink>,
    imager: Arc<dyn ImageProcessor>,
) -> Publisher {
    Publisher::new(
        PublisherConfig::new("key", "http://localhost:1337", "token"),
        source,
        sink,
        imager,
    )
}

#[tokio::test]
async fn all_articles_published_without_image_processing() {
    let source = Arc::new(FixtureSource::new(vec![
        article("one", Some("https://img.example.test/1.png")),
        article("two", Some("https://img.example.test/2.png")),
        article("three", None),
    ]));
    let sink = Arc::new(RecordingSink::accepting());
    let p = publisher(source.clone(), sink.clone(), Arc::new(OkImager));

    let result = p
        .run(&BatchRequest::new("technology", 3, false))
        .await
        .unwrap();

    assert_eq!(result.total_fetched, 3);
    assert_eq!(result.published, 3);
    assert_eq!(result.processed_images, None);
    assert_eq!(
        result.message,
        "Successfully published 3 out of 3 articles"
    );

    // Passthrough mode: original image URL kept, no asset, no upload calls.
    let records = sink.records.lock().unwrap();
    assert_eq!(
        records[0].image_url.as_deref(),
        Some("https://img.example.test/1.png")
    );
    assert!(records.iter().all(|r| r.image.is_none()));
    assert!(records.iter().all(|r| r.category == "technology"));
    drop(records);
    assert_eq!(sink.upload_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_item_does_not_stop_the_batch() {
    let source = Arc::new(FixtureSource::new(vec![
        article("one", None),
        article("two", None),
        article("three", None),
    ]));
    let reason = classify_publish_failure(reqwest::StatusCode::UNAUTHORIZED, "");
    let sink = Arc::new(RecordingSink::rejecting(1, reason));
    let p = publisher(source, sink.clone(), Arc::new(OkImager));

    let result = p
        .run(&BatchRequest::new("technology", 3, false))
        .await
        .unwrap();

    // All three were attempted even though item 2 failed.
    assert_eq!(sink.create_calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.total_fetched, 3);
    assert_eq!(result.published, 2);

    let failed = &result.outcomes[1];
    assert!(!failed.succeeded());
    let reason = failed.failure_reason().unwrap();
    assert!(reason.contains("Failed to publish \"two\""), "{reason}");
    assert!(reason.contains("Unauthorized"), "{reason}");

    // Invariant: published count equals succeeded outcomes.
    let succeeded = result.outcomes.iter().filter(|o| o.succeeded()).count();
    assert_eq!(result.published, succeeded);
    assert!(result.published <= result.total_fetched);
}

#[tokio::test]
async fn image_failure_downgrades_to_warning_and_item_still_publishes() {
    let source = Arc::new(FixtureSource::new(vec![article(
        "one",
        Some("https://img.example.test/1.png"),
    )]));
    let sink = Arc::new(RecordingSink::accepting());
    let p = publisher(source, sink.clone(), Arc::new(FailingImager));

    let result = p
        .run(&BatchRequest::new("technology", 1, true))
        .await
        .unwrap();

    assert_eq!(result.published, 1);
    assert_eq!(result.processed_images, Some(0));

    let outcome = &result.outcomes[0];
    assert!(outcome.succeeded());
    let warning = outcome.image_warning.as_deref().unwrap();
    assert!(warning.contains("Image processing failed for \"one\""), "{warning}");

    // Published without any image reference at all.
    let records = sink.records.lock().unwrap();
    assert!(records[0].image.is_none());
    assert!(records[0].image_url.is_none());
}

#[tokio::test]
async fn processed_images_are_uploaded_and_referenced() {
    let source = Arc::new(FixtureSource::new(vec![
        article("one", Some("https://img.example.test/1.png")),
        article("two", None),
    ]));
    let sink = Arc::new(RecordingSink::accepting());
    let p = publisher(source, sink.clone(), Arc::new(OkImager));

    let result = p
        .run(&BatchRequest::new("technology", 2, true))
        .await
        .unwrap();

    assert_eq!(result.published, 2);
    assert_eq!(result.processed_images, Some(1));
    assert_eq!(
        result.message,
        "Successfully published 2 out of 2 articles with 1 images processed"
    );
    // Only the article that carried an image reference hit the upload step.
    assert_eq!(sink.upload_calls.load(Ordering::SeqCst), 1);

    let records = sink.records.lock().unwrap();
    assert_eq!(records[0].image, Some(42));
    assert!(records[0].image_url.is_none());
    assert!(records[1].image.is_none());
}

#[tokio::test]
async fn failed_upload_is_a_warning_not_a_failure() {
    let source = Arc::new(FixtureSource::new(vec![article(
        "one",
        Some("https://img.example.test/1.png"),
    )]));
    let sink = Arc::new(RecordingSink {
        fail_uploads: true,
        ..RecordingSink::accepting()
    });
    let p = publisher(source, sink.clone(), Arc::new(OkImager));

    let result = p
        .run(&BatchRequest::new("technology", 1, true))
        .await
        .unwrap();

    assert_eq!(result.published, 1);
    assert_eq!(result.processed_images, Some(0));
    let warning = result.outcomes[0].image_warning.as_deref().unwrap();
    assert!(warning.contains("Upload failed"), "{warning}");
}
