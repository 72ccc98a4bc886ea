use std::collections::HashMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use super::PostMeta;

pub const DEFAULT_PER_PAGE: usize = 10;
pub const MAX_PER_PAGE: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
    Title,
    Popular,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostQuery {
    pub tag: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring matched against title, summary and tags.
    pub q: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub include_drafts: bool,
    #[serde(default)]
    pub featured_only: bool,
    #[serde(default)]
    pub sort: PostSort,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl PostQuery {
    #[must_use]
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn per_page(&self) -> usize {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    fn matches(&self, post: &PostMeta) -> bool {
        if post.draft && !self.include_drafts {
            return false;
        }
        if self.featured_only && !post.featured {
            return false;
        }
        if let Some(tag) = non_blank(self.tag.as_deref()) {
            if !post.has_tag(tag) {
                return false;
            }
        }
        if let Some(category) = non_blank(self.category.as_deref()) {
            if !post
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category))
            {
                return false;
            }
        }
        if let Some(year) = self.year {
            if post.published_at.year() != year {
                return false;
            }
        }
        if let Some(needle) = non_blank(self.q.as_deref()) {
            let needle = needle.to_lowercase();
            let in_title = post.title.to_lowercase().contains(&needle);
            let in_summary = post
                .summary
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&needle));
            let in_tags = post.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !(in_title || in_summary || in_tags) {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

pub(super) fn run(
    posts: &[PostMeta],
    query: &PostQuery,
    popularity: Option<&HashMap<String, u64>>,
) -> Page<PostMeta> {
    let mut matched: Vec<&PostMeta> = posts.iter().filter(|p| query.matches(p)).collect();

    let newest = |a: &&PostMeta, b: &&PostMeta| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.slug.cmp(&b.slug))
    };

    match (query.sort, popularity) {
        (PostSort::Oldest, _) => matched.sort_by(|a, b| newest(b, a)),
        (PostSort::Title, _) => matched.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| newest(a, b))
        }),
        (PostSort::Popular, Some(views)) => matched.sort_by(|a, b| {
            let va = views.get(&a.slug).copied().unwrap_or(0);
            let vb = views.get(&b.slug).copied().unwrap_or(0);
            vb.cmp(&va).then_with(|| newest(a, b))
        }),
        (PostSort::Newest | PostSort::Popular, _) => matched.sort_by(newest),
    }

    let total = matched.len();
    let per_page = query.per_page();
    let page = query.page();
    let total_pages = total.div_ceil(per_page);

    let items = matched
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .cloned()
        .collect();

    Page {
        items,
        total,
        page,
        per_page,
        total_pages,
    }
}
