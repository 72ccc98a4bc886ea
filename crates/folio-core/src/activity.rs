//! The normalized activity record shown in the site's feed.
//!
//! Every upstream source (blog posts, GitHub events, DEV.to articles,
//! reading lists) is mapped into [`ActivityItem`] before it reaches the feed,
//! so grouping, paging and trending logic only ever deal with one shape.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivitySource {
    Blog,
    Github,
    Devto,
    Reading,
    Project,
    Milestone,
}

impl ActivitySource {
    pub const ALL: [ActivitySource; 6] = [
        ActivitySource::Blog,
        ActivitySource::Github,
        ActivitySource::Devto,
        ActivitySource::Reading,
        ActivitySource::Project,
        ActivitySource::Milestone,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivitySource::Blog => "blog",
            ActivitySource::Github => "github",
            ActivitySource::Devto => "devto",
            ActivitySource::Reading => "reading",
            ActivitySource::Project => "project",
            ActivitySource::Milestone => "milestone",
        }
    }
}

impl std::fmt::Display for ActivitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivitySource {
    type Err = ActivityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivitySource::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ActivityError::UnknownSource(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityVerb {
    Published,
    Updated,
    Pushed,
    Released,
    Starred,
    Created,
    Opened,
    Merged,
    Bookmarked,
    Read,
    Achieved,
}

impl ActivityVerb {
    /// Past-tense noun used when summarising a run of same-verb items.
    #[must_use]
    pub fn plural_noun(self) -> &'static str {
        match self {
            ActivityVerb::Published => "posts",
            ActivityVerb::Updated => "updates",
            ActivityVerb::Pushed => "pushes",
            ActivityVerb::Released => "releases",
            ActivityVerb::Starred => "stars",
            ActivityVerb::Created => "creations",
            ActivityVerb::Opened => "opened items",
            ActivityVerb::Merged => "merges",
            ActivityVerb::Bookmarked => "bookmarks",
            ActivityVerb::Read => "reads",
            ActivityVerb::Achieved => "milestones",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ActivityStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub trending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trending_rank: Option<u32>,
    /// Items with the same source and thread key may be collapsed together
    /// (e.g. several pushes to one repository).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_key: Option<String>,
    /// Content slug for items backed by a local post; engagement counters
    /// are keyed by this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: String,
    pub source: ActivitySource,
    pub verb: ActivityVerb,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub href: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: ActivityMetadata,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivityError {
    #[error("activity id must not be empty")]
    EmptyId,

    #[error("activity {id} has an empty title")]
    EmptyTitle { id: String },

    #[error("activity {id} has an invalid href '{href}'")]
    InvalidHref { id: String, href: String },

    #[error("unknown activity source '{0}'")]
    UnknownSource(String),
}

impl ActivityItem {
    /// Basic shape checks applied to every item before it enters the feed.
    ///
    /// # Errors
    ///
    /// Returns [`ActivityError`] describing the first failed check.
    pub fn validate(&self) -> Result<(), ActivityError> {
        if self.id.trim().is_empty() {
            return Err(ActivityError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(ActivityError::EmptyTitle {
                id: self.id.clone(),
            });
        }
        if !is_valid_href(&self.href) {
            return Err(ActivityError::InvalidHref {
                id: self.id.clone(),
                href: self.href.clone(),
            });
        }
        Ok(())
    }

    /// Key used to look up engagement counters: the post slug when present,
    /// otherwise the item id.
    #[must_use]
    pub fn engagement_key(&self) -> &str {
        self.metadata.slug.as_deref().unwrap_or(&self.id)
    }
}

fn is_valid_href(href: &str) -> bool {
    let href = href.trim();
    if let Some(rest) = href
        .strip_prefix("https://")
        .or_else(|| href.strip_prefix("http://"))
    {
        return !rest.is_empty() && !rest.starts_with('/');
    }
    // Site-relative, but not protocol-relative.
    href.starts_with('/') && !href.starts_with("//")
}

/// Sort newest first; ties broken by id so output is deterministic.
pub fn sort_newest_first(items: &mut [ActivityItem]) {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// Drop items whose id was already seen, keeping the first occurrence.
#[must_use]
pub fn dedupe_by_id(items: Vec<ActivityItem>) -> Vec<ActivityItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

/// Keep items from the given sources. An empty filter keeps everything.
#[must_use]
pub fn filter_by_source(items: &[ActivityItem], sources: &[ActivitySource]) -> Vec<ActivityItem> {
    items
        .iter()
        .filter(|item| sources.is_empty() || sources.contains(&item.source))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub items: Vec<ActivityItem>,
    pub next_cursor: Option<usize>,
}

/// Offset-cursor pagination over an already-sorted slice.
#[must_use]
pub fn paginate(items: &[ActivityItem], cursor: Option<usize>, limit: usize) -> ActivityPage {
    let start = cursor.unwrap_or(0).min(items.len());
    let end = start.saturating_add(limit).min(items.len());
    let next_cursor = (end < items.len()).then_some(end);
    ActivityPage {
        items: items[start..end].to_vec(),
        next_cursor,
    }
}

/// Flag the `top_n` most-viewed items (by 24h views) as trending.
///
/// Only items with at least `min_views` views qualify. Existing trending
/// flags are cleared first, so the function can be re-applied after each
/// feed refresh.
pub fn mark_trending(
    items: &mut [ActivityItem],
    views_24h: &HashMap<String, u64>,
    top_n: usize,
    min_views: u64,
) {
    for item in items.iter_mut() {
        item.metadata.trending = false;
        item.metadata.trending_rank = None;
    }

    let mut ranked: Vec<(usize, u64)> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            views_24h
                .get(item.engagement_key())
                .copied()
                .filter(|views| *views >= min_views && *views > 0)
                .map(|views| (idx, views))
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| items[b.0].timestamp.cmp(&items[a.0].timestamp))
    });

    for (rank, (idx, _)) in ranked.into_iter().take(top_n).enumerate() {
        let item = &mut items[idx];
        item.metadata.trending = true;
        item.metadata.trending_rank = u32::try_from(rank + 1).ok();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;

    fn item(id: &str, hour: u32) -> ActivityItem {
        ActivityItem {
            id: id.to_string(),
            source: ActivitySource::Blog,
            verb: ActivityVerb::Published,
            title: format!("Title {id}"),
            description: None,
            href: format!("/blog/{id}"),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 10, hour, 0, 0).unwrap(),
            metadata: ActivityMetadata::default(),
        }
    }

    #[test]
    fn validate_accepts_relative_and_absolute_hrefs() {
        let mut a = item("a", 1);
        assert!(a.validate().is_ok());
        a.href = "https://github.com/octocat/hello".to_string();
        assert!(a.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        let mut a = item("a", 1);
        a.title = "   ".to_string();
        assert_eq!(
            a.validate(),
            Err(ActivityError::EmptyTitle {
                id: "a".to_string()
            })
        );

        let mut b = item("b", 1);
        b.href = "javascript:alert(1)".to_string();
        assert!(matches!(
            b.validate(),
            Err(ActivityError::InvalidHref { .. })
        ));

        let mut c = item("c", 1);
        c.href = "//evil.example".to_string();
        assert!(c.validate().is_err());

        let mut d = item("", 1);
        d.id = String::new();
        assert_eq!(d.validate(), Err(ActivityError::EmptyId));
    }

    #[test]
    fn source_parses_case_insensitively() {
        assert_eq!(
            "GitHub".parse::<ActivitySource>().unwrap(),
            ActivitySource::Github
        );
        assert!("myspace".parse::<ActivitySource>().is_err());
    }

    #[test]
    fn sort_and_dedupe_keep_newest_copy() {
        let mut items = vec![item("a", 1), item("b", 5), item("a", 9)];
        sort_newest_first(&mut items);
        let items = dedupe_by_id(items);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");
        assert_eq!(items[0].timestamp.hour(), 9);
        assert_eq!(items[1].id, "b");
    }

    #[test]
    fn filter_by_source_empty_filter_keeps_all() {
        let mut gh = item("gh", 2);
        gh.source = ActivitySource::Github;
        let items = vec![item("a", 1), gh];
        assert_eq!(filter_by_source(&items, &[]).len(), 2);
        let only_gh = filter_by_source(&items, &[ActivitySource::Github]);
        assert_eq!(only_gh.len(), 1);
        assert_eq!(only_gh[0].id, "gh");
    }

    #[test]
    fn paginate_walks_with_cursor() {
        let items: Vec<_> = (0..5).map(|i| item(&format!("i{i}"), i)).collect();
        let first = paginate(&items, None, 2);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_cursor, Some(2));

        let last = paginate(&items, Some(4), 2);
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.next_cursor, None);

        let past_end = paginate(&items, Some(99), 2);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.next_cursor, None);
    }

    #[test]
    fn mark_trending_ranks_by_views_and_respects_threshold() {
        let mut items = vec![item("a", 1), item("b", 2), item("c", 3)];
        items[2].metadata.slug = Some("post-c".to_string());
        let views = HashMap::from([
            ("a".to_string(), 5),
            ("b".to_string(), 50),
            ("post-c".to_string(), 20),
        ]);

        mark_trending(&mut items, &views, 2, 10);

        assert!(!items[0].metadata.trending, "below min_views");
        assert!(items[1].metadata.trending);
        assert_eq!(items[1].metadata.trending_rank, Some(1));
        assert!(items[2].metadata.trending);
        assert_eq!(items[2].metadata.trending_rank, Some(2));
    }

    #[test]
    fn mark_trending_clears_previous_flags() {
        let mut items = vec![item("a", 1)];
        items[0].metadata.trending = true;
        items[0].metadata.trending_rank = Some(1);
        mark_trending(&mut items, &HashMap::new(), 3, 1);
        assert!(!items[0].metadata.trending);
        assert_eq!(items[0].metadata.trending_rank, None);
    }

    #[test]
    fn metadata_serialization_skips_empty_fields() {
        let json = serde_json::to_value(item("a", 1)).unwrap();
        assert_eq!(json["source"], "blog");
        assert_eq!(json["verb"], "published");
        assert!(json["metadata"].get("tags").is_none());
        assert_eq!(json["metadata"]["trending"], false);
    }
}
