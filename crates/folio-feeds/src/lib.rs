//! Clients for the external sources shown on the activity timeline, and the
//! aggregator that merges them.

pub mod aggregate;
pub mod devto;
pub mod error;
pub mod github;
pub mod http;
pub mod inoreader;
pub(crate) mod retry;
pub mod rss;

pub use aggregate::{AggregateReport, FeedAggregator, SourceFailure};
pub use devto::{DevtoArticle, DevtoClient};
pub use error::FeedError;
pub use github::{GithubClient, GithubEvent};
pub use http::HttpConfig;
pub use inoreader::InoreaderClient;
pub use rss::{parse_feed, RssClient};
