// src/config.rs
// Process configuration: GNews API key plus Strapi base URL and token.
//
// Loaded once from the environment (dotenvy fills it in dev) and passed into
// the publisher at construction, so tests can inject fixtures instead of
// touching ambient globals.

use crate::error::BatchAbort;

pub const ENV_GNEWS_API_KEY: &str = "GNEWS_API_KEY";
pub const ENV_STRAPI_URL: &str = "STRAPI_URL";
pub const ENV_STRAPI_API_TOKEN: &str = "STRAPI_API_TOKEN";

#[derive(Debug, Clone, Default)]
pub struct PublisherConfig {
    pub gnews_api_key: Option<String>,
    pub strapi_url: Option<String>,
    pub strapi_token: Option<String>,
}

impl PublisherConfig {
    /// Read the three required variables from the environment. Empty values
    /// count as absent.
    pub fn from_env() -> Self {
        Self {
            gnews_api_key: read_var(ENV_GNEWS_API_KEY),
            strapi_url: read_var(ENV_STRAPI_URL).map(|u| normalize_base_url(&u)),
            strapi_token: read_var(ENV_STRAPI_API_TOKEN),
        }
    }

    pub fn new(gnews_api_key: &str, strapi_url: &str, strapi_token: &str) -> Self {
        Self {
            gnews_api_key: Some(gnews_api_key.to_string()),
            strapi_url: Some(normalize_base_url(strapi_url)),
            strapi_token: Some(strapi_token.to_string()),
        }
    }

    /// Confirm every required setting is present, with a distinct message per
    /// missing combination. Must pass before the first network call of a
    /// batch.
    pub fn validate(&self) -> Result<ValidatedConfig<'_>, BatchAbort> {
        let gnews_api_key = self.gnews_api_key.as_deref().ok_or_else(|| {
            BatchAbort::MissingConfig(
                "GNEWS_API_KEY environment variable is not configured".to_string(),
            )
        })?;

        match (self.strapi_url.as_deref(), self.strapi_token.as_deref()) {
            (Some(url), Some(token)) => Ok(ValidatedConfig {
                gnews_api_key,
                strapi_url: url,
                strapi_token: token,
            }),
            _ => Err(BatchAbort::MissingConfig(
                "STRAPI_URL or STRAPI_API_TOKEN environment variables are not configured"
                    .to_string(),
            )),
        }
    }
}

/// Borrowed view over a config whose required fields are all present.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedConfig<'a> {
    pub gnews_api_key: &'a str,
    pub strapi_url: &'a str,
    pub strapi_token: &'a str,
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
