// src/strapi.rs
// Strapi CMS client: content-record creation and binary asset upload.
//
// The pipeline talks to the `ContentSink` trait; `StrapiClient` is the live
// implementation. Failure classification mirrors Strapi v4's behavior for an
// `articles` content type behind an API token.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::ItemError;
use crate::images::ImageArtifact;

/// Opaque CMS-issued asset id. Numeric on the Strapi v4 wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Draft,
    Published,
}

/// One CMS content record. Built fresh per item, submitted once inside a
/// `{ "data": … }` envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub title: String,
    pub description: String,
    pub content: String,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Reference to an uploaded asset, not embedded bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<i64>,
    pub published_at: chrono::DateTime<chrono::Utc>,
    pub source_name: String,
    pub source_website: String,
    pub category: String,
    pub status: RecordStatus,
}

#[derive(Serialize)]
struct RecordEnvelope<'a, T: Serialize> {
    data: &'a T,
}

#[async_trait]
pub trait ContentSink: Send + Sync {
    /// Submit one record for creation. A non-success response is classified
    /// into a human-readable reason and returned as `RecordPublish`.
    async fn create_record(&self, record: &ContentRecord) -> Result<(), ItemError>;

    /// Upload one image artifact, returning the first issued asset id.
    /// Not idempotent: repeated calls create duplicate assets.
    async fn upload_asset(&self, artifact: &ImageArtifact) -> Result<AssetReference, ItemError>;
}

pub struct StrapiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl StrapiClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Side-effect-free reachability check used by diagnostics.
    pub async fn read_probe(&self) -> Result<(StatusCode, String)> {
        let resp = self
            .client
            .get(self.endpoint("/api/articles?pagination[limit]=1"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Ok((status, body))
    }

    /// Create a disposable draft record; diagnostics only.
    pub async fn create_draft_probe<T: Serialize + Sync>(
        &self,
        record: &T,
    ) -> Result<(StatusCode, String)> {
        let resp = self
            .client
            .post(self.endpoint("/api/articles"))
            .bearer_auth(&self.token)
            .json(&RecordEnvelope { data: record })
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Ok((status, body))
    }

    /// Remove a record created by the draft probe.
    pub async fn delete_record(&self, id: i64) -> Result<()> {
        self.client
            .delete(self.endpoint(&format!("/api/articles/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ContentSink for StrapiClient {
    async fn create_record(&self, record: &ContentRecord) -> Result<(), ItemError> {
        let resp = self
            .client
            .post(self.endpoint("/api/articles"))
            .bearer_auth(&self.token)
            .json(&RecordEnvelope { data: record })
            .send()
            .await
            .map_err(|e| ItemError::RecordPublish(e.to_string()))?;

        let status = resp.status();
        tracing::debug!(status = status.as_u16(), title = %record.title, "strapi create response");
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(ItemError::RecordPublish(classify_publish_failure(
            status, &body,
        )))
    }

    async fn upload_asset(&self, artifact: &ImageArtifact) -> Result<AssetReference, ItemError> {
        let part = reqwest::multipart::Part::bytes(artifact.encoded_bytes.clone())
            .file_name(artifact.generated_name.clone())
            .mime_str(&artifact.mime_type)
            .map_err(|e| ItemError::ImageUpload(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("files", part);

        let resp = self
            .client
            .post(self.endpoint("/api/upload"))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ItemError::ImageUpload(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = parse_error_message(&body)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ItemError::ImageUpload(format!("Upload failed: {detail}")));
        }

        let assets: Vec<UploadedAsset> = resp
            .json()
            .await
            .map_err(|e| ItemError::ImageUpload(e.to_string()))?;
        // Strapi returns an array of created assets; the first is ours.
        assets
            .first()
            .map(|a| AssetReference { id: a.id })
            .ok_or_else(|| ItemError::ImageUpload("Upload returned no assets".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct UploadedAsset {
    id: i64,
}

/// Turn a non-success record-creation response into a human-readable reason.
/// Well-known statuses get setup guidance; everything else falls back to the
/// body's error message, then the status text, then a truncated raw body.
pub fn classify_publish_failure(status: StatusCode, body: &str) -> String {
    match status {
        StatusCode::METHOD_NOT_ALLOWED => {
            "Method Not Allowed - Check if 'articles' content type exists and API permissions are enabled".to_string()
        }
        StatusCode::UNAUTHORIZED => {
            "Unauthorized - Check your API token permissions".to_string()
        }
        StatusCode::FORBIDDEN => {
            "Forbidden - API token doesn't have create permissions for articles".to_string()
        }
        StatusCode::NOT_FOUND => {
            "Not Found - 'articles' content type doesn't exist".to_string()
        }
        _ => match parse_error_message(body) {
            Some(msg) => format!("HTTP {}: {}", status.as_u16(), msg),
            None => format!(
                "HTTP {}: {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                truncate(body, 200)
            ),
        },
    }
}

/// Strapi error bodies nest the message under `error.message`; older shapes
/// use a top-level `message`.
pub fn parse_error_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.pointer("/error/message")
        .or_else(|| v.get("message"))
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
