//! Reading-time estimates and reading-progress math.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const WORDS_PER_MINUTE: u32 = 200;

/// A post counts as read once the reader has scrolled this far.
pub const FINISHED_PERCENT: u8 = 95;

/// Count whitespace-separated words that contain at least one alphanumeric
/// character, so markdown punctuation (`#`, `-`, `---`) is not counted.
#[must_use]
pub fn count_words(text: &str) -> u32 {
    let count = text
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Minutes needed to read `word_count` words, rounded up, never below one.
#[must_use]
pub fn reading_time_minutes(word_count: u32) -> u32 {
    word_count.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// Percentage of the document that has been scrolled past.
///
/// Documents that fit in the viewport count as fully read. Negative or
/// overshooting scroll positions (elastic scrolling) are clamped.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scroll_progress(scroll_top: f64, viewport_height: f64, document_height: f64) -> u8 {
    let scrollable = document_height - viewport_height;
    if !scrollable.is_finite() || scrollable <= 0.0 {
        return 100;
    }
    let ratio = (scroll_top / scrollable).clamp(0.0, 1.0);
    (ratio * 100.0).round() as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub slug: String,
    pub percent: u8,
    pub updated_at: DateTime<Utc>,
}

impl ReadingProgress {
    #[must_use]
    pub fn new(slug: impl Into<String>, percent: i64, updated_at: DateTime<Utc>) -> Self {
        Self {
            slug: slug.into(),
            percent: clamp_percent(percent),
            updated_at,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.percent >= FINISHED_PERCENT
    }
}

/// Clamp an arbitrary integer into `0..=100`.
#[must_use]
pub fn clamp_percent(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_words_ignores_markdown_punctuation() {
        assert_eq!(count_words("# Title\n\n- one two\n---\nthree"), 4);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn reading_time_rounds_up_with_floor_of_one() {
        assert_eq!(reading_time_minutes(0), 1);
        assert_eq!(reading_time_minutes(200), 1);
        assert_eq!(reading_time_minutes(201), 2);
        assert_eq!(reading_time_minutes(1_000), 5);
    }

    #[test]
    fn scroll_progress_clamps_and_handles_short_documents() {
        assert_eq!(scroll_progress(0.0, 800.0, 600.0), 100);
        assert_eq!(scroll_progress(0.0, 800.0, 1_800.0), 0);
        assert_eq!(scroll_progress(500.0, 800.0, 1_800.0), 50);
        assert_eq!(scroll_progress(5_000.0, 800.0, 1_800.0), 100);
        assert_eq!(scroll_progress(-40.0, 800.0, 1_800.0), 0);
        assert_eq!(scroll_progress(10.0, f64::NAN, 1_800.0), 100);
    }

    #[test]
    fn progress_is_clamped_and_finished_at_threshold() {
        let now = Utc::now();
        assert_eq!(ReadingProgress::new("a", -5, now).percent, 0);
        assert_eq!(ReadingProgress::new("a", 250, now).percent, 100);
        assert!(!ReadingProgress::new("a", 94, now).is_finished());
        assert!(ReadingProgress::new("a", 95, now).is_finished());
    }
}
