//! Merge every configured source into one timeline.

use std::collections::HashMap;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Mutex;

use folio_core::{dedupe_by_id, sort_newest_first, ActivityItem, AppConfig};

use crate::devto::{DevtoArticle, DevtoClient};
use crate::error::FeedError;
use crate::github::GithubClient;
use crate::http::HttpConfig;
use crate::inoreader::InoreaderClient;
use crate::rss::RssClient;

const INOREADER_COUNT: u32 = 50;

/// A source that failed during one aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
    /// Items carried over from the source's last successful fetch.
    pub reused_items: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    pub items: Vec<ActivityItem>,
    pub failures: Vec<SourceFailure>,
}

pub struct FeedAggregator {
    github: Option<(GithubClient, String)>,
    devto: Option<(DevtoClient, String)>,
    inoreader: Option<(InoreaderClient, String)>,
    rss: Option<(RssClient, Vec<String>)>,
    max_items: usize,
    last_good: Mutex<HashMap<String, Vec<ActivityItem>>>,
}

type SourceResult = (String, Result<Vec<ActivityItem>, FeedError>);

impl FeedAggregator {
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            github: None,
            devto: None,
            inoreader: None,
            rss: None,
            max_items: max_items.max(1),
            last_good: Mutex::new(HashMap::new()),
        }
    }

    /// Build clients for every source that has credentials configured.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if an HTTP client cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, FeedError> {
        let http = HttpConfig::from_app_config(config);
        let mut aggregator = Self::new(config.feed_max_items);

        if let Some(username) = &config.github_username {
            let client = GithubClient::new(http.clone(), config.github_token.clone())?;
            aggregator = aggregator.with_github(client, username.clone());
        }
        if let Some(username) = &config.devto_username {
            let client = DevtoClient::new(http.clone(), config.devto_api_key.clone())?;
            aggregator = aggregator.with_devto(client, username.clone());
        }
        if let Some(token) = &config.inoreader_access_token {
            let client = InoreaderClient::new(http.clone(), token.clone())?;
            aggregator = aggregator.with_inoreader(client, config.inoreader_stream_id.clone());
        }
        if !config.feed_urls.is_empty() {
            let client = RssClient::new(http)?;
            aggregator = aggregator.with_rss(client, config.feed_urls.clone());
        }

        tracing::info!(sources = ?aggregator.source_names(), "feed aggregator configured");
        Ok(aggregator)
    }

    #[must_use]
    pub fn with_github(mut self, client: GithubClient, username: String) -> Self {
        self.github = Some((client, username));
        self
    }

    #[must_use]
    pub fn with_devto(mut self, client: DevtoClient, username: String) -> Self {
        self.devto = Some((client, username));
        self
    }

    #[must_use]
    pub fn with_inoreader(mut self, client: InoreaderClient, stream_id: String) -> Self {
        self.inoreader = Some((client, stream_id));
        self
    }

    #[must_use]
    pub fn with_rss(mut self, client: RssClient, urls: Vec<String>) -> Self {
        self.rss = Some((client, urls));
        self
    }

    /// Names of the configured external sources, in fetch order.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.github.is_some() {
            names.push("github".to_string());
        }
        if self.devto.is_some() {
            names.push("devto".to_string());
        }
        if self.inoreader.is_some() {
            names.push("inoreader".to_string());
        }
        if let Some((_, urls)) = &self.rss {
            names.extend(urls.iter().map(|u| format!("rss:{u}")));
        }
        names
    }

    fn source_futures(&self) -> Vec<BoxFuture<'_, SourceResult>> {
        let mut futures: Vec<BoxFuture<'_, SourceResult>> = Vec::new();

        if let Some((client, username)) = &self.github {
            futures.push(
                async move { ("github".to_string(), client.fetch_activities(username).await) }
                    .boxed(),
            );
        }
        if let Some((client, username)) = &self.devto {
            futures.push(
                async move {
                    let result = client.fetch_article_metrics(username).await.map(|articles| {
                        articles
                            .into_iter()
                            .filter_map(DevtoArticle::into_activity)
                            .collect::<Vec<_>>()
                    });
                    ("devto".to_string(), result)
                }
                .boxed(),
            );
        }
        if let Some((client, stream_id)) = &self.inoreader {
            futures.push(
                async move {
                    (
                        "inoreader".to_string(),
                        client.fetch_stream(stream_id, INOREADER_COUNT).await,
                    )
                }
                .boxed(),
            );
        }
        if let Some((client, urls)) = &self.rss {
            for url in urls {
                futures.push(
                    async move { (format!("rss:{url}"), client.fetch_feed(url).await) }.boxed(),
                );
            }
        }
        futures
    }

    /// Fetch every source concurrently and merge with `local` (blog posts
    /// and other first-party items).
    ///
    /// A source that fails contributes the items of its last successful
    /// fetch, so a transient outage does not empty its part of the timeline.
    ///
    /// A failing source is logged and reported but never fails the run.
    /// Invalid items are dropped; the result is deduplicated by id, sorted
    /// newest first, and capped at `max_items`.
    pub async fn collect(&self, local: Vec<ActivityItem>) -> AggregateReport {
        let results = join_all(self.source_futures()).await;

        let mut items = local;
        let mut failures = Vec::new();
        let mut last_good = self.last_good.lock().await;
        for (source, result) in results {
            match result {
                Ok(fetched) => {
                    tracing::debug!(source = %source, count = fetched.len(), "source fetched");
                    items.extend(fetched.iter().cloned());
                    last_good.insert(source, fetched);
                }
                Err(e) => {
                    let reused = last_good.get(&source).map_or(&[][..], Vec::as_slice);
                    tracing::warn!(
                        source = %source,
                        error = %e,
                        reused_items = reused.len(),
                        "feed source failed, keeping previous items"
                    );
                    items.extend(reused.iter().cloned());
                    failures.push(SourceFailure {
                        reused_items: reused.len(),
                        source,
                        error: e.to_string(),
                    });
                }
            }
        }
        drop(last_good);

        let before = items.len();
        items.retain(|item| match item.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(id = %item.id, error = %e, "dropping invalid activity");
                false
            }
        });
        let mut items = dedupe_by_id(items);
        sort_newest_first(&mut items);
        items.truncate(self.max_items);

        tracing::info!(
            collected = before,
            kept = items.len(),
            failed_sources = failures.len(),
            "aggregated activity feed"
        );
        AggregateReport { items, failures }
    }
}
