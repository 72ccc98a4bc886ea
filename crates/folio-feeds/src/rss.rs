//! Generic RSS/Atom/JSON Feed sources.

use folio_core::{ActivityItem, ActivityMetadata, ActivitySource, ActivityVerb};
use reqwest::{Client, Url};

use crate::error::FeedError;
use crate::http::{build_client, check_status, HttpConfig};
use crate::retry::retry_with_backoff;

const DESCRIPTION_MAX_CHARS: usize = 280;

/// Parse a feed document into reading activities.
///
/// `source_label` namespaces entry ids so two feeds that reuse the same
/// entry id cannot collide. Entries without a usable link, title or date
/// are skipped.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] if the document is not a recognisable feed.
pub fn parse_feed(bytes: &[u8], source_label: &str) -> Result<Vec<ActivityItem>, FeedError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FeedError::Parse {
        context: source_label.to_string(),
        source: e,
    })?;
    let feed_title = feed.title.map(|t| t.content);

    let total = feed.entries.len();
    let items: Vec<ActivityItem> = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let timestamp = entry.published.or(entry.updated)?;
            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())?;
            let href = entry
                .links
                .iter()
                .find(|l| l.rel.as_deref().is_none_or(|r| r == "alternate"))
                .or_else(|| entry.links.first())
                .map(|l| l.href.clone())
                .filter(|h| h.starts_with("http://") || h.starts_with("https://"))?;
            let description = entry
                .summary
                .map(|s| truncate_chars(&strip_tags(&s.content), DESCRIPTION_MAX_CHARS))
                .filter(|s| !s.is_empty())
                .or_else(|| feed_title.clone());

            Some(ActivityItem {
                id: format!("rss:{source_label}:{}", entry.id),
                source: ActivitySource::Reading,
                verb: ActivityVerb::Read,
                title,
                description,
                href,
                timestamp,
                metadata: ActivityMetadata {
                    tags: entry.categories.into_iter().map(|c| c.term).collect(),
                    ..ActivityMetadata::default()
                },
            })
        })
        .collect();

    if items.len() < total {
        tracing::debug!(
            source = source_label,
            total,
            kept = items.len(),
            "skipped feed entries without link, title or date"
        );
    }
    Ok(items)
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Host name used as the id namespace for a feed URL.
fn label_for(url: &Url) -> String {
    url.host_str().unwrap_or("feed").to_string()
}

pub struct RssClient {
    client: Client,
    config: HttpConfig,
}

impl RssClient {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(config: HttpConfig) -> Result<Self, FeedError> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }

    /// Download and parse one feed.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidInput`] for a non-http(s) URL; otherwise the
    /// status-mapped HTTP errors or [`FeedError::Parse`].
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<ActivityItem>, FeedError> {
        let parsed = Url::parse(url).map_err(|e| FeedError::InvalidInput {
            field: "feed_url",
            reason: format!("'{url}': {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FeedError::InvalidInput {
                field: "feed_url",
                reason: format!("'{url}' must be http or https"),
            });
        }

        let target = &parsed;
        let bytes = retry_with_backoff(
            self.config.max_retries,
            self.config.backoff_base_ms,
            || async move {
                let response = check_status(self.client.get(target.clone()).send().await?, target)?;
                Ok(response.bytes().await?)
            },
        )
        .await?;

        let items = parse_feed(&bytes, &label_for(&parsed))?;
        tracing::debug!(url, count = items.len(), "fetched feed");
        Ok(items)
    }
}
