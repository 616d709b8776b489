// src/images/mod.rs
// Image acquisition and re-encoding: download the article's image, bound it
// to the display envelope, re-encode as JPEG at fixed quality.

pub mod codec;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;

use crate::error::ItemError;
use codec::{DecodedImage, ImageCodec, RasterCodec};

pub const MAX_WIDTH: u32 = 800;
pub const MAX_HEIGHT: u32 = 600;
pub const JPEG_QUALITY: u8 = 85;

// Some CDNs reject non-browser user agents outright.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// One re-encoded image, consumed by the upload step and then discarded.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub source_ref: String,
    pub encoded_bytes: Vec<u8>,
    pub mime_type: String,
    pub generated_name: String,
}

#[async_trait]
pub trait ImageProcessor: Send + Sync {
    /// Acquire and re-encode one source image. Any load, decode, or encode
    /// failure is an item-level error; it never escalates past the item.
    async fn process(&self, image_url: &str, article_title: &str)
        -> Result<ImageArtifact, ItemError>;
}

pub struct ImageTransformer {
    client: Client,
    codec: Box<dyn ImageCodec>,
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self::new(Box::new(RasterCodec))
    }
}

impl ImageTransformer {
    pub fn new(codec: Box<dyn ImageCodec>) -> Self {
        Self {
            client: Client::new(),
            codec,
        }
    }

    fn transform(&self, source: &DecodedImage) -> Result<Vec<u8>> {
        let (width, height) = bounded_dimensions(source.width, source.height);
        if (width, height) == (source.width, source.height) {
            self.codec.encode_jpeg(source, JPEG_QUALITY)
        } else {
            let scaled = self.codec.resize(source, width, height)?;
            self.codec.encode_jpeg(&scaled, JPEG_QUALITY)
        }
    }
}

#[async_trait]
impl ImageProcessor for ImageTransformer {
    async fn process(
        &self,
        image_url: &str,
        article_title: &str,
    ) -> Result<ImageArtifact, ItemError> {
        let resp = self
            .client
            .get(image_url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| ItemError::ImageAcquisition(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ItemError::ImageAcquisition(format!(
                "Failed to download image: {}",
                status.as_u16()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ItemError::ImageAcquisition(e.to_string()))?;

        let decoded = self
            .codec
            .decode(&bytes)
            .map_err(|e| ItemError::ImageAcquisition(e.to_string()))?;
        let encoded = self
            .transform(&decoded)
            .map_err(|e| ItemError::ImageAcquisition(e.to_string()))?;

        Ok(ImageArtifact {
            source_ref: image_url.to_string(),
            encoded_bytes: encoded,
            mime_type: "image/jpeg".to_string(),
            generated_name: generated_filename(article_title),
        })
    }
}

/// Fit `(width, height)` into the display envelope, preserving aspect ratio.
/// Images already inside the envelope come back unchanged (no upscaling).
pub fn bounded_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_WIDTH && height <= MAX_HEIGHT {
        return (width, height);
    }
    let ratio = f64::min(
        MAX_WIDTH as f64 / width as f64,
        MAX_HEIGHT as f64 / height as f64,
    );
    let w = ((width as f64 * ratio).round() as u32).max(1);
    let h = ((height as f64 * ratio).round() as u32).max(1);
    (w, h)
}

/// Filename for the uploaded asset: slugged title capped at 50 chars plus a
/// millisecond timestamp.
pub fn generated_filename(article_title: &str) -> String {
    let slug: String = article_title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .take(50)
        .collect();
    format!("{}-{}.jpg", slug, chrono::Utc::now().timestamp_millis())
}
