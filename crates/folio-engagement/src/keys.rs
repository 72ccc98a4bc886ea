//! Store key layout.
//!
//! Slugs are validated kebab-case, and reader ids are hashed to hex, so
//! neither can contain `:` and the prefixes below never overlap.

pub const VIEW_HISTORY_PREFIX: &str = "views:history:";

#[must_use]
pub fn views(slug: &str) -> String {
    format!("views:{slug}")
}

#[must_use]
pub fn view_history(slug: &str) -> String {
    format!("{VIEW_HISTORY_PREFIX}{slug}")
}

#[must_use]
pub fn likes(slug: &str) -> String {
    format!("likes:{slug}")
}

#[must_use]
pub fn bookmarks(slug: &str) -> String {
    format!("bookmarks:{slug}")
}

#[must_use]
pub fn progress(reader_hash: &str, slug: &str) -> String {
    format!("progress:{reader_hash}:{slug}")
}

#[must_use]
pub fn progress_history(reader_hash: &str) -> String {
    format!("progress:history:{reader_hash}")
}

/// Recover the slug from a view-history key.
#[must_use]
pub fn slug_from_view_history(key: &str) -> Option<&str> {
    key.strip_prefix(VIEW_HISTORY_PREFIX)
        .filter(|slug| !slug.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_key_round_trips_slug() {
        let key = view_history("hello-world");
        assert_eq!(key, "views:history:hello-world");
        assert_eq!(slug_from_view_history(&key), Some("hello-world"));
        assert_eq!(slug_from_view_history("views:hello-world"), None);
        assert_eq!(slug_from_view_history(VIEW_HISTORY_PREFIX), None);
    }

    #[test]
    fn counter_keys_are_namespaced() {
        assert_eq!(views("a"), "views:a");
        assert_eq!(likes("a"), "likes:a");
        assert_eq!(bookmarks("a"), "bookmarks:a");
        assert_eq!(progress("abc", "a"), "progress:abc:a");
        assert_eq!(progress_history("abc"), "progress:history:abc");
    }
}
