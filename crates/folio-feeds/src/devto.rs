//! DEV.to articles and engagement metrics.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use folio_core::{ActivityItem, ActivityMetadata, ActivitySource, ActivityStats, ActivityVerb};
use regex::Regex;
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer};

use crate::error::FeedError;
use crate::http::{build_client, check_status, decode_json, join, parse_base_url, HttpConfig};
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://dev.to/api/";
const PER_PAGE: &str = "100";

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").expect("valid regex"));

/// One article as returned by `/articles` and `/articles/me/published`.
///
/// `page_views_count` is only present on the authenticated endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DevtoArticle {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "tags_from_list_or_csv")]
    pub tag_list: Vec<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub public_reactions_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub page_views_count: Option<u64>,
    #[serde(default)]
    pub reading_time_minutes: Option<u32>,
}

// The list endpoint sends `tag_list` as an array, the single-article
// endpoint as a comma-separated string.
fn tags_from_list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Option::<Tags>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Tags::List(tags)) => tags,
        Some(Tags::Csv(raw)) => raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

impl DevtoArticle {
    /// `None` for unpublished drafts, which have no timestamp.
    #[must_use]
    pub fn into_activity(self) -> Option<ActivityItem> {
        let timestamp = self.published_at?;
        Some(ActivityItem {
            id: format!("devto:{}", self.id),
            source: ActivitySource::Devto,
            verb: ActivityVerb::Published,
            title: self.title,
            description: self.description.filter(|d| !d.trim().is_empty()),
            href: self.url,
            timestamp,
            metadata: ActivityMetadata {
                tags: self.tag_list,
                stats: Some(ActivityStats {
                    views: self.page_views_count,
                    likes: Some(self.public_reactions_count),
                    comments: Some(self.comments_count),
                    stars: None,
                }),
                image: self.cover_image,
                ..ActivityMetadata::default()
            },
        })
    }
}

/// Client for the DEV.to (Forem) REST API.
pub struct DevtoClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    config: HttpConfig,
}

impl DevtoClient {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(config: HttpConfig, api_key: Option<String>) -> Result<Self, FeedError> {
        Self::with_base_url(config, api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different API root (a mock server in tests).
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`FeedError::InvalidInput`] if `base_url` does not parse.
    pub fn with_base_url(
        config: HttpConfig,
        api_key: Option<String>,
        base_url: &str,
    ) -> Result<Self, FeedError> {
        Ok(Self {
            client: build_client(&config)?,
            base_url: parse_base_url(base_url)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            config,
        })
    }

    /// Public articles for `username`, newest first as DEV.to returns them.
    ///
    /// # Errors
    ///
    /// - [`FeedError::InvalidInput`] if `username` is malformed (no request is sent).
    /// - [`FeedError::NotFound`] for an unknown user.
    /// - [`FeedError::Unauthorized`], [`FeedError::RateLimited`],
    ///   [`FeedError::UnexpectedStatus`] for the matching HTTP statuses.
    /// - [`FeedError::Deserialize`] if the body does not match.
    pub async fn fetch_article_metrics(
        &self,
        username: &str,
    ) -> Result<Vec<DevtoArticle>, FeedError> {
        if !USERNAME_RE.is_match(username) {
            return Err(FeedError::InvalidInput {
                field: "username",
                reason: format!("'{username}' must match [A-Za-z0-9_]{{1,64}}"),
            });
        }

        let mut url = join(&self.base_url, "articles")?;
        url.query_pairs_mut()
            .append_pair("username", username)
            .append_pair("per_page", PER_PAGE);

        let articles = self
            .get_articles(&url, None, &format!("articles(username={username})"))
            .await?;
        tracing::debug!(username, count = articles.len(), "fetched dev.to articles");
        Ok(articles)
    }

    /// The authenticated user's published articles, including page views.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidInput`] if no API key is configured; otherwise as
    /// [`Self::fetch_article_metrics`].
    pub async fn fetch_my_articles(&self) -> Result<Vec<DevtoArticle>, FeedError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(FeedError::InvalidInput {
                field: "api_key",
                reason: "DEVTO_API_KEY is not configured".to_string(),
            });
        };

        let mut url = join(&self.base_url, "articles/me/published")?;
        url.query_pairs_mut().append_pair("per_page", PER_PAGE);

        self.get_articles(&url, Some(api_key), "articles/me/published")
            .await
    }

    async fn get_articles(
        &self,
        url: &Url,
        api_key: Option<&str>,
        context: &str,
    ) -> Result<Vec<DevtoArticle>, FeedError> {
        retry_with_backoff(
            self.config.max_retries,
            self.config.backoff_base_ms,
            || async move {
                let mut request = self.client.get(url.clone());
                if let Some(key) = api_key {
                    request = request.header("api-key", key);
                }
                let response = check_status(request.send().await?, url)?;
                decode_json::<Vec<DevtoArticle>>(response, context).await
            },
        )
        .await
    }
}
