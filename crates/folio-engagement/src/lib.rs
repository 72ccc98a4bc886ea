//! Engagement counters (views, likes, bookmarks) and reading progress.
//!
//! Counters live in a key-value store behind [`CounterStore`]. View history
//! is a sorted set of timestamps per post so "views in the last 24h/90d" is
//! a range count.

pub mod keys;
pub mod memory;
mod progress;
pub mod service;
pub mod store;

pub use memory::MemoryStore;
pub use progress::reader_hash;
pub use service::{Clock, DailyCount, Engagement, PostStats, DAY, HISTORY_RETENTION};
pub use store::{CounterStore, StoreError};
