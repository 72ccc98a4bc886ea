use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::DateTime;
use folio_core::{clamp_percent, ReadingProgress};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::keys;
use crate::service::{lenient, millis, score, Engagement};

static READER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{8,64}$").expect("reader id regex is valid")
});

/// Hex chars of the SHA-256 digest kept as the stored reader id.
const READER_HASH_LEN: usize = 32;

/// Stable, non-reversible key for a client-supplied reader id. `None` when
/// the id is malformed.
#[must_use]
pub fn reader_hash(reader: &str) -> Option<String> {
    if !READER_RE.is_match(reader) {
        return None;
    }
    let digest = Sha256::digest(reader.as_bytes());
    let mut out = String::with_capacity(READER_HASH_LEN);
    for byte in digest.iter().take(READER_HASH_LEN / 2) {
        let _ = write!(out, "{byte:02x}");
    }
    Some(out)
}

fn checked(op: &'static str, reader: &str, slug: Option<&str>) -> Option<String> {
    let Some(hash) = reader_hash(reader) else {
        tracing::warn!(op, "rejected invalid reader id");
        return None;
    };
    if let Some(slug) = slug {
        if !folio_core::is_valid_slug(slug) {
            tracing::warn!(op, slug, "rejected invalid slug");
            return None;
        }
    }
    Some(hash)
}

impl Engagement {
    /// Store `percent` (clamped to 0..=100) as the reader's position in a post.
    pub async fn record_progress(
        &self,
        reader: &str,
        slug: &str,
        percent: i64,
    ) -> Option<ReadingProgress> {
        let hash = checked("record_progress", reader, Some(slug))?;
        let now = self.now();
        let progress = ReadingProgress::new(slug, percent, now);

        let key = keys::progress(&hash, slug);
        lenient(
            "set",
            &key,
            self.store.set(&key, i64::from(progress.percent)).await,
        )?;

        let history = keys::progress_history(&hash);
        if let Err(e) = self
            .store
            .zadd(&history, score(now.timestamp_millis()), slug)
            .await
        {
            tracing::warn!(key = %history, error = %e, "failed to index reading progress");
        }

        tracing::debug!(slug, percent = progress.percent, "recorded reading progress");
        Some(progress)
    }

    /// Progress for one post, or `None` when the reader has not opened it
    /// (or the store is unavailable).
    pub async fn get_progress(&self, reader: &str, slug: &str) -> Option<ReadingProgress> {
        let hash = checked("get_progress", reader, Some(slug))?;
        let key = keys::progress(&hash, slug);
        let percent = lenient("get", &key, self.store.get(&key).await)??;

        let history = keys::progress_history(&hash);
        let entries = lenient(
            "zrange_by_score",
            &history,
            self.store
                .zrange_by_score(&history, f64::NEG_INFINITY, f64::INFINITY)
                .await,
        )?;
        let updated_at = entries
            .iter()
            .find(|(member, _)| member == slug)
            .and_then(|(_, s)| DateTime::from_timestamp_millis(millis(*s)))
            .unwrap_or_else(|| self.now());

        Some(ReadingProgress {
            slug: slug.to_string(),
            percent: clamp_percent(percent),
            updated_at,
        })
    }

    /// Every post the reader has progress on, most recently touched first.
    pub async fn list_progress(&self, reader: &str) -> Option<Vec<ReadingProgress>> {
        let hash = checked("list_progress", reader, None)?;
        let history = keys::progress_history(&hash);
        let entries = lenient(
            "zrange_by_score",
            &history,
            self.store
                .zrange_by_score(&history, f64::NEG_INFINITY, f64::INFINITY)
                .await,
        )?;
        if entries.is_empty() {
            return Some(Vec::new());
        }

        let value_keys: Vec<String> = entries
            .iter()
            .map(|(slug, _)| keys::progress(&hash, slug))
            .collect();
        let values = lenient("mget", &history, self.store.mget(&value_keys).await)?;

        let mut list: Vec<ReadingProgress> = entries
            .into_iter()
            .zip(values)
            .filter_map(|((slug, s), value)| {
                Some(ReadingProgress {
                    percent: clamp_percent(value?),
                    updated_at: DateTime::from_timestamp_millis(millis(s))?,
                    slug,
                })
            })
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.slug.cmp(&b.slug)));
        Some(list)
    }
}
