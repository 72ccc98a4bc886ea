//! Inoreader stream contents (starred and read articles).
//!
//! The client is handed a ready access token; obtaining one through OAuth
//! happens elsewhere.

use chrono::{DateTime, Utc};
use folio_core::{ActivityItem, ActivityMetadata, ActivitySource, ActivityVerb};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::FeedError;
use crate::http::{build_client, check_status, decode_json, join, parse_base_url, HttpConfig};
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://www.inoreader.com/reader/api/0/";
const STARRED_TAG: &str = "user/-/state/com.google/starred";
const MAX_COUNT: u32 = 100;

// Everything but RFC 3986 unreserved characters, so `/` in a stream id is escaped.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Deserialize)]
pub struct StreamContents {
    #[serde(default)]
    pub items: Vec<StreamItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamItem {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Unix seconds.
    pub published: i64,
    #[serde(default)]
    pub canonical: Vec<Link>,
    #[serde(default)]
    pub alternate: Vec<Link>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Origin {
    #[serde(default)]
    pub title: Option<String>,
}

impl StreamItem {
    fn is_starred(&self) -> bool {
        self.categories
            .iter()
            .any(|c| c == STARRED_TAG || c.ends_with("/state/com.google/starred"))
    }

    /// Starred items become bookmarks, everything else a read. Items with
    /// no link or no title are dropped.
    #[must_use]
    pub fn into_activity(self) -> Option<ActivityItem> {
        let verb = if self.is_starred() {
            ActivityVerb::Bookmarked
        } else {
            ActivityVerb::Read
        };
        let href = self
            .canonical
            .into_iter()
            .chain(self.alternate)
            .map(|l| l.href)
            .find(|h| h.starts_with("http://") || h.starts_with("https://"))?;
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let timestamp = DateTime::<Utc>::from_timestamp(self.published, 0)?;

        Some(ActivityItem {
            id: format!("inoreader:{}", self.id),
            source: ActivitySource::Reading,
            verb,
            title,
            description: self.origin.and_then(|o| o.title),
            href,
            timestamp,
            metadata: ActivityMetadata::default(),
        })
    }
}

pub struct InoreaderClient {
    client: Client,
    base_url: Url,
    access_token: String,
    config: HttpConfig,
}

impl InoreaderClient {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(config: HttpConfig, access_token: String) -> Result<Self, FeedError> {
        Self::with_base_url(config, access_token, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`FeedError::InvalidInput`] if `base_url` does not parse.
    pub fn with_base_url(
        config: HttpConfig,
        access_token: String,
        base_url: &str,
    ) -> Result<Self, FeedError> {
        Ok(Self {
            client: build_client(&config)?,
            base_url: parse_base_url(base_url)?,
            access_token,
            config,
        })
    }

    /// Up to `count` (clamped to 1..=100) newest items of `stream_id`.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidInput`] for an empty stream id; otherwise the
    /// status-mapped errors of the shared client.
    pub async fn fetch_stream(
        &self,
        stream_id: &str,
        count: u32,
    ) -> Result<Vec<ActivityItem>, FeedError> {
        if stream_id.trim().is_empty() {
            return Err(FeedError::InvalidInput {
                field: "stream_id",
                reason: "must not be empty".to_string(),
            });
        }

        let encoded = utf8_percent_encode(stream_id, SEGMENT).to_string();
        let mut url = join(&self.base_url, &format!("stream/contents/{encoded}"))?;
        url.query_pairs_mut()
            .append_pair("n", &count.clamp(1, MAX_COUNT).to_string());
        let context = format!("stream/contents({stream_id})");
        let (url, context) = (&url, context.as_str());

        let contents = retry_with_backoff(
            self.config.max_retries,
            self.config.backoff_base_ms,
            || async move {
                let request = self
                    .client
                    .get(url.clone())
                    .bearer_auth(&self.access_token);
                let response = check_status(request.send().await?, url)?;
                decode_json::<StreamContents>(response, context).await
            },
        )
        .await?;

        let fetched = contents.items.len();
        let items: Vec<ActivityItem> = contents
            .items
            .into_iter()
            .filter_map(StreamItem::into_activity)
            .collect();
        tracing::debug!(stream_id, fetched, kept = items.len(), "fetched inoreader stream");
        Ok(items)
    }
}
