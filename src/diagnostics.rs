// src/diagnostics.rs
// Setup probe: validates configuration and connectivity to both external
// systems ahead of a real batch. Everything here is report-only; probe
// failures are never escalated.

use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::config::PublisherConfig;
use crate::gnews::{ArticleSource, GNewsClient};
use crate::strapi::StrapiClient;

/// Presence flags only. Never echoes secret values; lengths are enough to
/// spot an empty or truncated paste.
#[derive(Debug, Serialize)]
pub struct EnvChecks {
    pub gnews_api_key: bool,
    pub gnews_key_length: usize,
    pub strapi_url: Option<String>,
    pub strapi_token: bool,
    pub strapi_token_length: usize,
}

#[derive(Debug, Serialize)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ProbeOutcome {
    fn ok(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: detail.into(),
            suggestion: None,
        }
    }

    fn failed(detail: impl Into<String>, suggestion: Option<&str>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
            suggestion: suggestion.map(|s| s.to_string()),
        }
    }

    fn skipped(reason: &str) -> Self {
        Self::failed(reason, None)
    }
}

#[derive(Debug, Serialize)]
pub struct SetupReport {
    pub checks: EnvChecks,
    pub gnews: ProbeOutcome,
    pub strapi: ProbeOutcome,
    pub content_type: ProbeOutcome,
    pub all_good: bool,
}

/// Run all setup checks against the live collaborators.
pub async fn run_setup_probe(config: &PublisherConfig) -> SetupReport {
    let checks = EnvChecks {
        gnews_api_key: config.gnews_api_key.is_some(),
        gnews_key_length: config.gnews_api_key.as_deref().map_or(0, str::len),
        strapi_url: config.strapi_url.clone(),
        strapi_token: config.strapi_token.is_some(),
        strapi_token_length: config.strapi_token.as_deref().map_or(0, str::len),
    };

    let gnews = match config.gnews_api_key.as_deref() {
        Some(key) => probe_gnews(key).await,
        None => ProbeOutcome::skipped("GNews API key not configured"),
    };

    let (strapi, content_type) = match (
        config.strapi_url.as_deref(),
        config.strapi_token.as_deref(),
    ) {
        (Some(url), Some(token)) => {
            let client = StrapiClient::new(url.to_string(), token.to_string());
            let read = probe_strapi_read(&client).await;
            // Only attempt the write probe when reads already work.
            let write = if read.ok {
                probe_content_type(&client).await
            } else {
                ProbeOutcome::skipped("Skipped: read probe failed")
            };
            (read, write)
        }
        _ => {
            let missing = ProbeOutcome::skipped("Missing Strapi URL or API token");
            (missing, ProbeOutcome::skipped("Missing Strapi URL or API token"))
        }
    };

    let all_good = checks.gnews_api_key
        && checks.strapi_url.is_some()
        && checks.strapi_token
        && gnews.ok
        && strapi.ok
        && content_type.ok;

    SetupReport {
        checks,
        gnews,
        strapi,
        content_type,
        all_good,
    }
}

async fn probe_gnews(api_key: &str) -> ProbeOutcome {
    let client = GNewsClient::new(api_key.to_string());
    match client.search("test", 1).await {
        Ok(_) => ProbeOutcome::ok("Connection successful!"),
        Err(e) => ProbeOutcome::failed(format!("{e}"), None),
    }
}

async fn probe_strapi_read(client: &StrapiClient) -> ProbeOutcome {
    match client.read_probe().await {
        Ok((status, body)) => {
            debug!(status = status.as_u16(), "strapi read probe");
            if status.is_success() {
                ProbeOutcome::ok("Connection successful!")
            } else {
                let (detail, suggestion) = classify_read_probe(status, &body);
                ProbeOutcome::failed(detail, suggestion)
            }
        }
        Err(e) => ProbeOutcome::failed(format!("Network error: {e}"), None),
    }
}

/// Disposable draft record exercised by the write probe. Deliberately
/// minimal; this is not the pipeline's record mapping.
#[derive(Serialize)]
struct ProbeRecord {
    title: &'static str,
    description: &'static str,
    content: &'static str,
    status: &'static str,
}

const PROBE_RECORD: ProbeRecord = ProbeRecord {
    title: "Test Article - Please Delete",
    description: "This is a test article created by the News Publisher setup checker",
    content: "This article can be safely deleted.",
    status: "draft",
};

async fn probe_content_type(client: &StrapiClient) -> ProbeOutcome {
    match client.create_draft_probe(&PROBE_RECORD).await {
        Ok((status, body)) => {
            if status.is_success() {
                // Clean up: the probe record is disposable.
                if let Some(id) = parse_created_id(&body) {
                    if let Err(e) = client.delete_record(id).await {
                        debug!(error = %e, id, "probe record cleanup failed");
                    }
                }
                return ProbeOutcome::ok(
                    "Articles content type is properly configured and accessible",
                );
            }
            let (detail, suggestion) = classify_write_probe(status, &body);
            ProbeOutcome::failed(detail, suggestion)
        }
        Err(e) => ProbeOutcome::failed(format!("Network error: {e}"), None),
    }
}

fn classify_read_probe(status: StatusCode, body: &str) -> (String, Option<&'static str>) {
    match status {
        StatusCode::NOT_FOUND => (
            "Articles content type does not exist".to_string(),
            Some("Create an 'articles' content type in your Strapi Content-Type Builder"),
        ),
        StatusCode::FORBIDDEN => (
            "API token doesn't have permission to access articles".to_string(),
            Some("Check your API token permissions in Strapi Settings -> API Tokens"),
        ),
        StatusCode::UNAUTHORIZED => (
            "Invalid API token".to_string(),
            Some("Verify your STRAPI_API_TOKEN is correct"),
        ),
        _ => (
            format!("HTTP {}: {}", status.as_u16(), crate::strapi::parse_error_message(body)
                .unwrap_or_else(|| body.chars().take(200).collect())),
            None,
        ),
    }
}

fn classify_write_probe(status: StatusCode, body: &str) -> (String, Option<&'static str>) {
    match status {
        StatusCode::METHOD_NOT_ALLOWED => (
            "Method Not Allowed - Cannot create articles".to_string(),
            Some("Enable 'create' permission for articles in Settings -> Roles or your API token role"),
        ),
        StatusCode::BAD_REQUEST => (
            format!(
                "Validation error: {}",
                crate::strapi::parse_error_message(body).unwrap_or_else(|| body.to_string())
            ),
            Some("Check if all required fields are present in your articles content type"),
        ),
        _ => (
            format!(
                "Failed to create test article: HTTP {} - {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            ),
            None,
        ),
    }
}

fn parse_created_id(body: &str) -> Option<i64> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    v.pointer("/data/id").and_then(|id| id.as_i64())
}
