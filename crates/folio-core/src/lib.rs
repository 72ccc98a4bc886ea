pub mod activity;
pub mod app_config;
pub mod config;
pub mod grouping;
pub mod posts;
pub mod reading;
pub mod slug;

use thiserror::Error;

pub use activity::{
    dedupe_by_id, filter_by_source, mark_trending, paginate, sort_newest_first, ActivityError,
    ActivityItem, ActivityMetadata, ActivityPage, ActivitySource, ActivityStats, ActivityVerb,
};
pub use app_config::{AppConfig, Environment, StoreBackend};
pub use config::{load_app_config, load_app_config_from_env};
pub use grouping::{group_by_time, thread_activities, ActivityGroup, ActivityThread, TimeBucket};
pub use posts::{
    ArchiveEntry, CatalogError, Page, PostCatalog, PostMeta, PostQuery, PostSort, TagCount,
};
pub use reading::{
    clamp_percent, count_words, reading_time_minutes, scroll_progress, ReadingProgress,
};
pub use slug::{is_valid_slug, slugify, MAX_SLUG_LEN};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
