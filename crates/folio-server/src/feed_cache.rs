//! The last aggregated activity timeline, shared between the API and the
//! refresh job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_core::{mark_trending, ActivityItem, PostCatalog};
use folio_engagement::Engagement;
use folio_feeds::{FeedAggregator, SourceFailure};
use serde::Serialize;
use tokio::sync::RwLock;

const TRENDING_TOP_N: usize = 3;
const TRENDING_MIN_VIEWS: u64 = 5;

#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub items: Vec<ActivityItem>,
    pub failures: Vec<SourceFailure>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub items: usize,
    pub trending: usize,
    pub failures: Vec<SourceFailure>,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct FeedCache {
    inner: Arc<RwLock<FeedSnapshot>>,
}

impl FeedCache {
    /// Start from a fixed item list; used when no refresh has run yet.
    #[must_use]
    pub fn with_items(items: Vec<ActivityItem>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(FeedSnapshot {
                items,
                failures: Vec::new(),
                refreshed_at: None,
            })),
        }
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, snapshot: FeedSnapshot) {
        *self.inner.write().await = snapshot;
    }
}

/// Re-aggregate every source, flag trending blog posts from their 24h
/// views, and swap the result into `cache`.
///
/// Source failures are recorded in the snapshot; a run never fails as a
/// whole, so the previous timeline is always replaced.
pub async fn refresh(
    cache: &FeedCache,
    aggregator: &FeedAggregator,
    catalog: &PostCatalog,
    engagement: &Engagement,
) -> RefreshSummary {
    let report = aggregator.collect(catalog.activities()).await;
    let mut items = report.items;

    let slugs: Vec<String> = items
        .iter()
        .filter_map(|item| item.metadata.slug.clone())
        .collect();
    let views_24h = engagement.get_views_24h_for_slugs(&slugs).await;
    mark_trending(&mut items, &views_24h, TRENDING_TOP_N, TRENDING_MIN_VIEWS);

    let refreshed_at = Utc::now();
    let summary = RefreshSummary {
        items: items.len(),
        trending: items.iter().filter(|i| i.metadata.trending).count(),
        failures: report.failures.clone(),
        refreshed_at,
    };

    cache
        .replace(FeedSnapshot {
            items,
            failures: report.failures,
            refreshed_at: Some(refreshed_at),
        })
        .await;

    tracing::info!(
        items = summary.items,
        trending = summary.trending,
        failed_sources = summary.failures.len(),
        "activity feed refreshed"
    );
    summary
}
