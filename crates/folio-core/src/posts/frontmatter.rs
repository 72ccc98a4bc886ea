use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use super::{CatalogError, PostMeta};
use crate::reading::{count_words, reading_time_minutes};
use crate::slug::{is_valid_slug, slugify};

/// The YAML block at the top of a post file.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontMatter {
    pub title: String,
    pub slug: Option<String>,
    #[serde(alias = "description")]
    pub summary: Option<String>,
    #[serde(alias = "date")]
    pub published_at: NaiveDate,
    #[serde(default, alias = "updated")]
    pub updated_at: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(alias = "image")]
    pub cover_image: Option<String>,
}

pub(super) fn load_post(path: &Path) -> Result<PostMeta, CatalogError> {
    let raw = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    parse_post(&path.display().to_string(), stem, &raw)
}

/// Parse a post file's contents.
///
/// `origin` is used only in error messages; `fallback_slug` is used when the
/// front matter has no `slug`.
///
/// # Errors
///
/// Returns a [`CatalogError`] if the front matter is missing, malformed, or
/// fails validation.
pub fn parse_post(origin: &str, fallback_slug: &str, raw: &str) -> Result<PostMeta, CatalogError> {
    let (yaml, body) = split_front_matter(raw).ok_or_else(|| CatalogError::MissingFrontMatter {
        path: origin.to_string(),
    })?;

    let fm: FrontMatter = serde_yaml::from_str(yaml).map_err(|e| CatalogError::FrontMatter {
        path: origin.to_string(),
        source: e,
    })?;

    let invalid = |reason: String| CatalogError::Validation {
        path: origin.to_string(),
        reason,
    };

    let title = fm.title.trim().to_string();
    if title.is_empty() {
        return Err(invalid("title must be non-empty".to_string()));
    }

    let slug = fm.slug.unwrap_or_else(|| slugify(fallback_slug));
    if !is_valid_slug(&slug) {
        return Err(invalid(format!("invalid slug '{slug}'")));
    }

    if let Some(updated) = fm.updated_at {
        if updated < fm.published_at {
            return Err(invalid(format!(
                "updated date {updated} precedes publish date {}",
                fm.published_at
            )));
        }
    }

    // First spelling of a tag wins; later case variants are dropped.
    let mut seen = HashSet::new();
    let tags: Vec<String> = fm
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect();

    let word_count = count_words(body);

    Ok(PostMeta {
        slug,
        title,
        summary: fm.summary.filter(|s| !s.trim().is_empty()),
        published_at: fm.published_at,
        updated_at: fm.updated_at,
        tags,
        category: fm.category.filter(|c| !c.trim().is_empty()),
        draft: fm.draft,
        featured: fm.featured,
        cover_image: fm.cover_image,
        word_count,
        reading_time_minutes: reading_time_minutes(word_count),
    })
}

/// Split `---\n<yaml>\n---\n<body>` into its two halves.
fn split_front_matter(raw: &str) -> Option<(&str, &str)> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let rest = raw
        .strip_prefix("---\r\n")
        .or_else(|| raw.strip_prefix("---\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}
