//! Content slug validation.

use std::sync::LazyLock;

use regex::Regex;

pub const MAX_SLUG_LEN: usize = 128;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"));

/// Returns `true` if `slug` is lowercase kebab-case ASCII and at most
/// [`MAX_SLUG_LEN`] bytes.
///
/// Slugs end up inside store keys and URLs, so anything with separators,
/// whitespace, or uppercase is refused.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_LEN && SLUG_PATTERN.is_match(slug)
}

/// Derive a slug from free text (e.g. a file stem or a title).
#[must_use]
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
