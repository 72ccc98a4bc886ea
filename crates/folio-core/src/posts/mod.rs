//! Blog post catalog: front-matter loading, filtering and sidebar aggregates.

mod frontmatter;
mod query;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activity::{ActivityItem, ActivityMetadata, ActivitySource, ActivityVerb};

pub use frontmatter::{parse_post, FrontMatter};
pub use query::{Page, PostQuery, PostSort, DEFAULT_PER_PAGE, MAX_PER_PAGE};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: missing front matter block")]
    MissingFrontMatter { path: String },

    #[error("{path}: invalid front matter: {source}")]
    FrontMatter {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{path}: invalid post: {reason}")]
    Validation { path: String, reason: String },

    #[error("duplicate post slug '{slug}'")]
    DuplicateSlug { slug: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMeta {
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub published_at: NaiveDate,
    pub updated_at: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub draft: bool,
    pub featured: bool,
    pub cover_image: Option<String>,
    pub word_count: u32,
    pub reading_time_minutes: u32,
}

impl PostMeta {
    #[must_use]
    pub fn href(&self) -> String {
        format!("/blog/{}", self.slug)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// The feed record for this post. Updated posts surface as updates at
    /// their update date.
    #[must_use]
    pub fn to_activity(&self) -> ActivityItem {
        let (verb, date) = match self.updated_at {
            Some(updated) if updated > self.published_at => (ActivityVerb::Updated, updated),
            _ => (ActivityVerb::Published, self.published_at),
        };
        ActivityItem {
            id: format!("blog:{}", self.slug),
            source: ActivitySource::Blog,
            verb,
            title: self.title.clone(),
            description: self.summary.clone(),
            href: self.href(),
            timestamp: date.and_time(NaiveTime::MIN).and_utc(),
            metadata: ActivityMetadata {
                tags: self.tags.clone(),
                image: self.cover_image.clone(),
                slug: Some(self.slug.clone()),
                ..ActivityMetadata::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub year: i32,
    pub month: u32,
    pub count: usize,
}

/// In-memory set of posts, newest first.
#[derive(Debug, Clone, Default)]
pub struct PostCatalog {
    posts: Vec<PostMeta>,
}

impl PostCatalog {
    /// Load every `*.md` / `*.mdx` file in `dir`.
    ///
    /// Files with broken front matter are logged and skipped so one bad
    /// draft does not take the site down. Duplicate slugs are a hard error
    /// because they would make URLs and counters ambiguous. A missing
    /// directory yields an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the directory cannot be listed and
    /// [`CatalogError::DuplicateSlug`] if two files share a slug.
    pub fn load(dir: &Path) -> Result<Self, CatalogError> {
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "content directory missing; catalog is empty");
            return Ok(Self::default());
        }

        let entries = std::fs::read_dir(dir).map_err(|e| CatalogError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == "md" || ext == "mdx")
            })
            .collect();
        paths.sort();

        let mut posts = Vec::with_capacity(paths.len());
        for path in paths {
            match frontmatter::load_post(&path) {
                Ok(post) => posts.push(post),
                Err(e) => tracing::warn!(error = %e, "skipping post"),
            }
        }

        tracing::info!(dir = %dir.display(), count = posts.len(), "loaded post catalog");
        Self::from_posts(posts)
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateSlug`] if two posts share a slug.
    pub fn from_posts(mut posts: Vec<PostMeta>) -> Result<Self, CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for post in &posts {
            if !seen.insert(post.slug.as_str()) {
                return Err(CatalogError::DuplicateSlug {
                    slug: post.slug.clone(),
                });
            }
        }
        posts.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(Self { posts })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Published (non-draft) posts, newest first.
    pub fn published(&self) -> impl Iterator<Item = &PostMeta> {
        self.posts.iter().filter(|p| !p.draft)
    }

    /// Look up a published post by slug. Drafts are invisible here.
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&PostMeta> {
        self.published().find(|p| p.slug == slug)
    }

    #[must_use]
    pub fn contains(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    /// Filter, sort and page posts. `popularity` maps slug → view count and
    /// is only consulted for [`PostSort::Popular`].
    #[must_use]
    pub fn query(
        &self,
        query: &PostQuery,
        popularity: Option<&HashMap<String, u64>>,
    ) -> Page<PostMeta> {
        query::run(&self.posts, query, popularity)
    }

    /// The posts published immediately before (older) and after (newer)
    /// `slug`.
    #[must_use]
    pub fn adjacent(&self, slug: &str) -> (Option<&PostMeta>, Option<&PostMeta>) {
        let published: Vec<&PostMeta> = self.published().collect();
        let Some(idx) = published.iter().position(|p| p.slug == slug) else {
            return (None, None);
        };
        let older = published.get(idx + 1).copied();
        let newer = idx.checked_sub(1).and_then(|i| published.get(i)).copied();
        (older, newer)
    }

    /// Posts sharing the most tags with `slug`, then the most recent.
    /// Posts with no tag in common are not considered related.
    #[must_use]
    pub fn related(&self, slug: &str, limit: usize) -> Vec<&PostMeta> {
        let Some(target) = self.get(slug) else {
            return Vec::new();
        };

        let mut scored: Vec<(usize, &PostMeta)> = self
            .published()
            .filter(|p| p.slug != slug)
            .map(|p| {
                let shared = p.tags.iter().filter(|t| target.has_tag(t)).count();
                (shared, p)
            })
            .filter(|(shared, _)| *shared > 0)
            .collect();

        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.published_at.cmp(&a.1.published_at))
        });
        scored.into_iter().take(limit).map(|(_, p)| p).collect()
    }

    /// Tag usage across published posts, most used first.
    #[must_use]
    pub fn tag_counts(&self) -> Vec<TagCount> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for post in self.published() {
            for tag in &post.tags {
                *counts.entry(tag.to_lowercase()).or_default() += 1;
            }
        }
        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        tags
    }

    /// Distinct categories, alphabetical.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .published()
            .filter_map(|p| p.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Post counts per month, newest month first.
    #[must_use]
    pub fn archive(&self) -> Vec<ArchiveEntry> {
        let mut months: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        for post in self.published() {
            let key = (post.published_at.year(), post.published_at.month());
            *months.entry(key).or_default() += 1;
        }
        months
            .into_iter()
            .rev()
            .map(|((year, month), count)| ArchiveEntry { year, month, count })
            .collect()
    }

    /// Feed records for every published post.
    #[must_use]
    pub fn activities(&self) -> Vec<ActivityItem> {
        self.published().map(PostMeta::to_activity).collect()
    }
}

#[cfg(test)]
#[path = "posts_test.rs"]
mod tests;
