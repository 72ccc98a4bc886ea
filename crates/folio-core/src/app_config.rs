use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where engagement counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local store; counters are lost on restart.
    Memory,
    Postgres,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub content_dir: PathBuf,
    pub site_url: String,
    pub site_title: String,
    pub store: StoreBackend,
    /// Required when `store` is [`StoreBackend::Postgres`].
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub http_max_retries: u32,
    pub http_retry_backoff_ms: u64,
    pub github_username: Option<String>,
    pub github_token: Option<String>,
    pub devto_username: Option<String>,
    pub devto_api_key: Option<String>,
    pub inoreader_access_token: Option<String>,
    pub inoreader_stream_id: String,
    pub feed_urls: Vec<String>,
    pub feed_max_items: usize,
    pub feed_refresh_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("content_dir", &self.content_dir)
            .field("site_url", &self.site_url)
            .field("site_title", &self.site_title)
            .field("store", &self.store)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_retry_backoff_ms", &self.http_retry_backoff_ms)
            .field("github_username", &self.github_username)
            .field(
                "github_token",
                &self.github_token.as_ref().map(|_| "[redacted]"),
            )
            .field("devto_username", &self.devto_username)
            .field(
                "devto_api_key",
                &self.devto_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "inoreader_access_token",
                &self.inoreader_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("inoreader_stream_id", &self.inoreader_stream_id)
            .field("feed_urls", &self.feed_urls)
            .field("feed_max_items", &self.feed_max_items)
            .field("feed_refresh_cron", &self.feed_refresh_cron)
            .finish()
    }
}
