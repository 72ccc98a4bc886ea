//! View, like and bookmark counters on top of a [`CounterStore`].
//!
//! Every operation here swallows store errors: the failure is logged and
//! the caller gets `None` (or an empty map). Pages render without counters
//! rather than failing when the store is down.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::keys;
use crate::store::{CounterStore, StoreError};

/// One day in milliseconds.
pub const DAY: i64 = 86_400_000;

/// View events older than this are pruned from history.
pub const HISTORY_RETENTION: i64 = 90 * DAY;

const MAX_DAILY_WINDOW: u32 = 365;

/// Source of "now"; swapped out in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostStats {
    pub views: Option<u64>,
    pub views_24h: Option<u64>,
    pub views_90d: Option<u64>,
    pub likes: Option<u64>,
    pub bookmarks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Clone)]
pub struct Engagement {
    pub(crate) store: Arc<dyn CounterStore>,
    clock: Clock,
}

impl std::fmt::Debug for Engagement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engagement").finish_non_exhaustive()
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn score(millis: i64) -> f64 {
    millis as f64
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn millis(score: f64) -> i64 {
    score as i64
}

pub(crate) fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Log a store failure and turn it into `None`.
pub(crate) fn lenient<T>(op: &'static str, key: &str, result: Result<T, StoreError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(op, key, error = %e, "counter store operation failed");
            None
        }
    }
}

fn checked_slug(op: &'static str, slug: &str) -> Option<()> {
    if folio_core::is_valid_slug(slug) {
        Some(())
    } else {
        tracing::warn!(op, slug, "rejected invalid slug");
        None
    }
}

impl Engagement {
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            clock: Arc::new(Utc::now),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Whether the backing store answers.
    pub async fn is_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "counter store ping failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Count one view: bump the total, append to history, and trim history
    /// older than [`HISTORY_RETENTION`]. Returns the new total.
    ///
    /// History failures are logged but do not void the total increment.
    pub async fn increment_post_views(&self, slug: &str) -> Option<u64> {
        checked_slug("increment_post_views", slug)?;
        let key = keys::views(slug);
        let total = lenient("incr", &key, self.store.incr(&key).await)?;

        let now = self.now().timestamp_millis();
        let history = keys::view_history(slug);
        let member = format!("{now}-{}", Uuid::new_v4().simple());
        if let Err(e) = self.store.zadd(&history, score(now), &member).await {
            tracing::warn!(key = %history, error = %e, "failed to record view event");
        }
        if let Err(e) = self
            .store
            .zremrangebyscore(
                &history,
                f64::NEG_INFINITY,
                score(now - HISTORY_RETENTION - 1),
            )
            .await
        {
            tracing::warn!(key = %history, error = %e, "failed to trim view history");
        }

        tracing::debug!(slug, total, "recorded post view");
        Some(to_count(total))
    }

    pub async fn get_post_views(&self, slug: &str) -> Option<u64> {
        checked_slug("get_post_views", slug)?;
        let key = keys::views(slug);
        let value = lenient("get", &key, self.store.get(&key).await)?;
        Some(value.map_or(0, to_count))
    }

    /// Views recorded within the trailing `window_ms`.
    pub async fn get_post_views_in_window(&self, slug: &str, window_ms: i64) -> Option<u64> {
        checked_slug("get_post_views_in_window", slug)?;
        let key = keys::view_history(slug);
        let min = score(self.now().timestamp_millis() - window_ms);
        lenient(
            "zcount",
            &key,
            self.store.zcount(&key, min, f64::INFINITY).await,
        )
    }

    pub async fn get_post_views_24h(&self, slug: &str) -> Option<u64> {
        self.get_post_views_in_window(slug, DAY).await
    }

    pub async fn get_post_views_90d(&self, slug: &str) -> Option<u64> {
        self.get_post_views_in_window(slug, HISTORY_RETENTION).await
    }

    /// Total views for many slugs in one `mget`. Invalid slugs are skipped;
    /// slugs without a counter map to 0. A store failure yields an empty map.
    pub async fn get_views_for_slugs(&self, slugs: &[String]) -> HashMap<String, u64> {
        let valid: Vec<&String> = slugs
            .iter()
            .filter(|s| folio_core::is_valid_slug(s))
            .collect();
        if valid.is_empty() {
            return HashMap::new();
        }

        let keys: Vec<String> = valid.iter().map(|s| keys::views(s)).collect();
        let Some(values) = lenient("mget", "views:*", self.store.mget(&keys).await) else {
            return HashMap::new();
        };

        valid
            .into_iter()
            .zip(values)
            .map(|(slug, value)| (slug.clone(), value.map_or(0, to_count)))
            .collect()
    }

    /// 24h view counts for many slugs, queried concurrently. Slugs whose
    /// lookup fails are left out.
    pub async fn get_views_24h_for_slugs(&self, slugs: &[String]) -> HashMap<String, u64> {
        let lookups = slugs.iter().map(|slug| async move {
            self.get_post_views_24h(slug)
                .await
                .map(|count| (slug.clone(), count))
        });
        join_all(lookups).await.into_iter().flatten().collect()
    }

    /// Per-day view counts for the last `days` days ending today (UTC),
    /// oldest first, with zero-filled gaps. `days` is clamped to `1..=365`.
    pub async fn daily_views(&self, slug: &str, days: u32) -> Option<Vec<DailyCount>> {
        checked_slug("daily_views", slug)?;
        let days = days.clamp(1, MAX_DAILY_WINDOW);
        let today = self.now().date_naive();
        let first_day = today - Duration::days(i64::from(days) - 1);
        let start = first_day.and_time(NaiveTime::MIN).and_utc().timestamp_millis();

        let key = keys::view_history(slug);
        let events = lenient(
            "zrange_by_score",
            &key,
            self.store
                .zrange_by_score(&key, score(start), f64::INFINITY)
                .await,
        )?;

        let mut counts: HashMap<NaiveDate, u64> = HashMap::new();
        for (_, event_score) in events {
            if let Some(ts) = DateTime::<Utc>::from_timestamp_millis(millis(event_score)) {
                *counts.entry(ts.date_naive()).or_default() += 1;
            }
        }

        Some(
            first_day
                .iter_days()
                .take_while(|d| *d <= today)
                .map(|date| DailyCount {
                    date,
                    count: counts.get(&date).copied().unwrap_or(0),
                })
                .collect(),
        )
    }

    /// Drop view events older than the retention window for one post.
    pub async fn prune_history(&self, slug: &str) -> Option<u64> {
        checked_slug("prune_history", slug)?;
        self.prune_history_key(&keys::view_history(slug)).await
    }

    async fn prune_history_key(&self, key: &str) -> Option<u64> {
        let cutoff = self.now().timestamp_millis() - HISTORY_RETENTION - 1;
        lenient(
            "zremrangebyscore",
            key,
            self.store
                .zremrangebyscore(key, f64::NEG_INFINITY, score(cutoff))
                .await,
        )
    }

    /// Prune every post's view history. Keys that fail are logged and
    /// skipped; the return value is the number of events removed.
    pub async fn prune_all_history(&self) -> Option<u64> {
        let history_keys = lenient(
            "keys_with_prefix",
            keys::VIEW_HISTORY_PREFIX,
            self.store
                .keys_with_prefix(keys::VIEW_HISTORY_PREFIX)
                .await,
        )?;

        let mut removed = 0;
        for key in &history_keys {
            if keys::slug_from_view_history(key).is_none() {
                continue;
            }
            removed += self.prune_history_key(key).await.unwrap_or(0);
        }
        tracing::info!(
            keys = history_keys.len(),
            removed,
            "pruned view history"
        );
        Some(removed)
    }

    // -----------------------------------------------------------------------
    // Likes and bookmarks
    // -----------------------------------------------------------------------

    async fn bump(&self, op: &'static str, key: String, up: bool) -> Option<u64> {
        let result = if up {
            self.store.incr(&key).await
        } else {
            self.store.decr_floor_zero(&key).await
        };
        lenient(op, &key, result).map(to_count)
    }

    async fn read(&self, op: &'static str, key: String) -> Option<u64> {
        let value = lenient(op, &key, self.store.get(&key).await)?;
        Some(value.map_or(0, to_count))
    }

    pub async fn increment_likes(&self, slug: &str) -> Option<u64> {
        checked_slug("increment_likes", slug)?;
        self.bump("incr", keys::likes(slug), true).await
    }

    /// Never takes the count below zero.
    pub async fn decrement_likes(&self, slug: &str) -> Option<u64> {
        checked_slug("decrement_likes", slug)?;
        self.bump("decr_floor_zero", keys::likes(slug), false)
            .await
    }

    pub async fn get_likes(&self, slug: &str) -> Option<u64> {
        checked_slug("get_likes", slug)?;
        self.read("get", keys::likes(slug)).await
    }

    pub async fn increment_bookmarks(&self, slug: &str) -> Option<u64> {
        checked_slug("increment_bookmarks", slug)?;
        self.bump("incr", keys::bookmarks(slug), true).await
    }

    /// Never takes the count below zero.
    pub async fn decrement_bookmarks(&self, slug: &str) -> Option<u64> {
        checked_slug("decrement_bookmarks", slug)?;
        self.bump("decr_floor_zero", keys::bookmarks(slug), false)
            .await
    }

    pub async fn get_bookmarks(&self, slug: &str) -> Option<u64> {
        checked_slug("get_bookmarks", slug)?;
        self.read("get", keys::bookmarks(slug)).await
    }

    /// All counters for one post. Each field is independently `None` when
    /// its lookup fails.
    pub async fn get_post_stats(&self, slug: &str) -> PostStats {
        let (views, views_24h, views_90d, likes, bookmarks) = tokio::join!(
            self.get_post_views(slug),
            self.get_post_views_24h(slug),
            self.get_post_views_90d(slug),
            self.get_likes(slug),
            self.get_bookmarks(slug),
        );
        PostStats {
            views,
            views_24h,
            views_90d,
            likes,
            bookmarks,
        }
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;
