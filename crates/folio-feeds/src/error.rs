use thiserror::Error;

/// Errors returned by the external feed clients.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("not found: {url}")]
    NotFound { url: String },

    /// 401 or 403; the credential is missing, wrong, or lacks scope.
    #[error("unauthorized: {url}")]
    Unauthorized { url: String },

    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Caller input rejected before any request was sent.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("feed parse error for {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: feed_rs::parser::ParseFeedError,
    },
}
