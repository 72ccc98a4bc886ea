//! Shared HTTP plumbing for the feed clients.

use std::time::Duration;

use folio_core::AppConfig;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::FeedError;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_USER_AGENT: &str = "folio/0.1 (personal-site)";
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for transient errors.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.http_user_agent.clone(),
            max_retries: config.http_max_retries,
            backoff_base_ms: config.http_retry_backoff_ms,
        }
    }
}

pub(crate) fn build_client(config: &HttpConfig) -> Result<Client, FeedError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(config.user_agent.as_str())
        .build()?;
    Ok(client)
}

/// Parse `base_url`, forcing exactly one trailing slash so `Url::join`
/// appends to the path instead of replacing its last segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, FeedError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| FeedError::InvalidInput {
        field: "base_url",
        reason: format!("'{base_url}': {e}"),
    })
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url, FeedError> {
    base.join(path).map_err(|e| FeedError::InvalidInput {
        field: "path",
        reason: format!("'{path}': {e}"),
    })
}

/// Map non-2xx responses to typed errors; pass 2xx through.
pub(crate) fn check_status(response: Response, url: &Url) -> Result<Response, FeedError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = url.to_string();
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            FeedError::RateLimited { retry_after_secs }
        }
        StatusCode::NOT_FOUND => FeedError::NotFound { url },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FeedError::Unauthorized { url },
        other => FeedError::UnexpectedStatus {
            status: other.as_u16(),
            url,
        },
    })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, FeedError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| FeedError::Deserialize {
        context: context.to_string(),
        source: e,
    })
}
