//! Offline tests for folio-db pool configuration.
//! These tests do not require a live database connection.

use folio_core::{AppConfig, Environment, StoreBackend};
use folio_db::{connect_pool_from_config, DbError, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

fn app_config(database_url: Option<&str>) -> AppConfig {
    AppConfig {
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        content_dir: PathBuf::from("./content/blog"),
        site_url: "http://localhost:3000".to_string(),
        site_title: "folio".to_string(),
        store: StoreBackend::Postgres,
        database_url: database_url.map(str::to_string),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        http_timeout_secs: 15,
        http_user_agent: "ua".to_string(),
        http_max_retries: 2,
        http_retry_backoff_ms: 500,
        github_username: None,
        github_token: None,
        devto_username: None,
        devto_api_key: None,
        inoreader_access_token: None,
        inoreader_stream_id: "user/-/state/com.google/starred".to_string(),
        feed_urls: Vec::new(),
        feed_max_items: 200,
        feed_refresh_cron: "0 */15 * * * *".to_string(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config(Some("postgres://example")));
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[tokio::test]
async fn connect_without_url_is_a_typed_error() {
    let err = connect_pool_from_config(&app_config(None))
        .await
        .expect_err("no url configured");
    assert!(matches!(err, DbError::MissingDatabaseUrl));
}
