use crate::app_config::{AppConfig, Environment, StoreBackend};
use crate::ConfigError;

const DEFAULT_INOREADER_STREAM: &str = "user/-/state/com.google/starred";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `.env` templates can leave keys blank.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("FOLIO_ENV", "development"))?;

    let bind_addr = or_default("FOLIO_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("FOLIO_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("FOLIO_LOG_LEVEL", "info");
    let content_dir = PathBuf::from(or_default("FOLIO_CONTENT_DIR", "./content/blog"));

    let site_url = or_default("FOLIO_SITE_URL", "http://localhost:3000");
    if !(site_url.starts_with("http://") || site_url.starts_with("https://")) {
        return Err(invalid(
            "FOLIO_SITE_URL",
            "must start with http:// or https://".to_string(),
        ));
    }
    let site_url = site_url.trim_end_matches('/').to_string();
    let site_title = or_default("FOLIO_SITE_TITLE", "folio");

    let store = parse_store_backend(&or_default("FOLIO_STORE", "memory"))?;
    let database_url = optional("DATABASE_URL");
    if store == StoreBackend::Postgres && database_url.is_none() {
        return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
    }

    let db_max_connections = parse_u32("FOLIO_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FOLIO_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "FOLIO_DB_MIN_CONNECTIONS",
            format!("must not exceed FOLIO_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("FOLIO_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_timeout_secs = parse_u64("FOLIO_HTTP_TIMEOUT_SECS", "15")?;
    let http_user_agent = or_default("FOLIO_USER_AGENT", "folio/0.1 (personal-site)");
    let http_max_retries = parse_u32("FOLIO_HTTP_MAX_RETRIES", "2")?;
    let http_retry_backoff_ms = parse_u64("FOLIO_HTTP_RETRY_BACKOFF_MS", "500")?;

    let feed_urls = parse_feed_urls(&or_default("FOLIO_FEED_URLS", ""))
        .map_err(|reason| invalid("FOLIO_FEED_URLS", reason))?;
    let feed_max_items = parse_usize("FOLIO_FEED_MAX_ITEMS", "200")?;
    if feed_max_items == 0 {
        return Err(invalid(
            "FOLIO_FEED_MAX_ITEMS",
            "must be at least 1".to_string(),
        ));
    }
    let feed_refresh_cron = or_default("FOLIO_FEED_REFRESH_CRON", "0 */15 * * * *");

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        content_dir,
        site_url,
        site_title,
        store,
        database_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        http_user_agent,
        http_max_retries,
        http_retry_backoff_ms,
        github_username: optional("GITHUB_USERNAME"),
        github_token: optional("GITHUB_TOKEN"),
        devto_username: optional("DEVTO_USERNAME"),
        devto_api_key: optional("DEVTO_API_KEY"),
        inoreader_access_token: optional("INOREADER_ACCESS_TOKEN"),
        inoreader_stream_id: optional("INOREADER_STREAM_ID")
            .unwrap_or_else(|| DEFAULT_INOREADER_STREAM.to_string()),
        feed_urls,
        feed_max_items,
        feed_refresh_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FOLIO_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_store_backend(s: &str) -> Result<StoreBackend, ConfigError> {
    match s {
        "memory" => Ok(StoreBackend::Memory),
        "postgres" => Ok(StoreBackend::Postgres),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FOLIO_STORE".to_string(),
            reason: format!("expected 'memory' or 'postgres', got '{other}'"),
        }),
    }
}

/// Split a comma-separated list of feed URLs, rejecting anything that is not http(s).
fn parse_feed_urls(raw: &str) -> Result<Vec<String>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|url| {
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(format!("'{url}' is not an http(s) URL"))
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
