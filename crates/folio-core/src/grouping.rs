//! Grouping of a flat, newest-first activity list for display.
//!
//! Two views are supported: calendar buckets ("Today", "Yesterday", ...)
//! and threads, where consecutive items about the same thing (pushes to one
//! repository, say) collapse into a single entry.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;

use crate::activity::{ActivityItem, ActivitySource, ActivityVerb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeBucket {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    Earlier { year: i32, month: u32 },
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl TimeBucket {
    /// Bucket for `timestamp` relative to `now`, using UTC calendar days.
    ///
    /// "This week" covers the 2-6 days before today and "this month" the
    /// 7-29 days before today; anything older falls into its calendar month.
    /// Timestamps in the future are treated as today.
    #[must_use]
    pub fn for_timestamp(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let date = timestamp.date_naive();
        let days_ago = (today - date).num_days();

        match days_ago {
            i64::MIN..=0 => TimeBucket::Today,
            1 => TimeBucket::Yesterday,
            2..=6 => TimeBucket::ThisWeek,
            7..=29 => TimeBucket::ThisMonth,
            _ => TimeBucket::Earlier {
                year: date.year(),
                month: date.month(),
            },
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        match self {
            TimeBucket::Today => "Today".to_string(),
            TimeBucket::Yesterday => "Yesterday".to_string(),
            TimeBucket::ThisWeek => "This week".to_string(),
            TimeBucket::ThisMonth => "This month".to_string(),
            TimeBucket::Earlier { year, month } => {
                let name = usize::try_from(*month)
                    .ok()
                    .and_then(|m| m.checked_sub(1))
                    .and_then(|idx| MONTH_NAMES.get(idx))
                    .copied()
                    .unwrap_or("Unknown");
                format!("{name} {year}")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityGroup {
    pub bucket: TimeBucket,
    pub label: String,
    pub items: Vec<ActivityItem>,
}

/// Group newest-first items into calendar buckets.
///
/// Groups come out in the order their first item appears, which for a
/// newest-first input means newest bucket first. Input order within a
/// bucket is preserved and empty buckets are never emitted.
#[must_use]
pub fn group_by_time(items: &[ActivityItem], now: DateTime<Utc>) -> Vec<ActivityGroup> {
    let mut groups: Vec<ActivityGroup> = Vec::new();

    for item in items {
        let bucket = TimeBucket::for_timestamp(item.timestamp, now);
        match groups.iter_mut().find(|g| g.bucket == bucket) {
            Some(group) => group.items.push(item.clone()),
            None => groups.push(ActivityGroup {
                bucket,
                label: bucket.label(),
                items: vec![item.clone()],
            }),
        }
    }

    groups
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityThread {
    pub key: Option<String>,
    pub source: ActivitySource,
    pub verb: ActivityVerb,
    pub items: Vec<ActivityItem>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl ActivityThread {
    fn single(item: ActivityItem) -> Self {
        Self {
            key: item.metadata.thread_key.clone(),
            source: item.source,
            verb: item.verb,
            started_at: item.timestamp,
            ended_at: item.timestamp,
            items: vec![item],
        }
    }

    /// Whether `item` continues this thread: same source, same non-empty key,
    /// and close enough in time to the oldest item already in the thread.
    fn accepts(&self, item: &ActivityItem, window: Duration) -> bool {
        let Some(key) = self.key.as_deref() else {
            return false;
        };
        item.source == self.source
            && item.metadata.thread_key.as_deref() == Some(key)
            && (self.started_at - item.timestamp).abs() <= window
    }

    fn push(&mut self, item: ActivityItem) {
        self.started_at = self.started_at.min(item.timestamp);
        self.ended_at = self.ended_at.max(item.timestamp);
        self.items.push(item);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One-line description such as "3 pushes to octocat/hello".
    #[must_use]
    pub fn summary(&self) -> String {
        match (self.items.as_slice(), self.key.as_deref()) {
            ([only], _) => only.title.clone(),
            (items, Some(key)) => {
                format!("{} {} to {key}", items.len(), self.verb.plural_noun())
            }
            (items, None) => format!("{} {}", items.len(), self.verb.plural_noun()),
        }
    }
}

/// Collapse consecutive related items into threads.
///
/// Items are expected newest-first. An item joins the thread directly before
/// it when both share a source and a thread key and the item is within
/// `window` of that thread's oldest member. Items without a thread key are
/// always their own thread. Thread order follows first appearance.
#[must_use]
pub fn thread_activities(items: &[ActivityItem], window: Duration) -> Vec<ActivityThread> {
    let mut threads: Vec<ActivityThread> = Vec::new();

    for item in items {
        match threads.last_mut() {
            Some(current) if current.accepts(item, window) => current.push(item.clone()),
            _ => threads.push(ActivityThread::single(item.clone())),
        }
    }

    threads
}
