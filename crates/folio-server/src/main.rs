mod api;
mod feed_cache;
mod middleware;
mod scheduler;

use std::{net::SocketAddr, sync::Arc};

use folio_core::{AppConfig, Environment, PostCatalog, StoreBackend};
use folio_engagement::{CounterStore, Engagement, MemoryStore};
use folio_feeds::FeedAggregator;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState, SiteInfo},
    feed_cache::FeedCache,
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(folio_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = build_store(&config).await?;
    let catalog = Arc::new(PostCatalog::load(&config.content_dir)?);

    let state = AppState {
        engagement: Engagement::new(store),
        feed: FeedCache::with_items(catalog.activities()),
        catalog,
        aggregator: Arc::new(FeedAggregator::from_app_config(&config)?),
        site: Arc::new(SiteInfo {
            url: config.site_url.clone(),
            title: config.site_title.clone(),
        }),
    };

    // Fill the cache in the background so startup does not wait on
    // external APIs.
    let warmup = state.clone();
    tokio::spawn(async move {
        feed_cache::refresh(
            &warmup.feed,
            &warmup.aggregator,
            &warmup.catalog,
            &warmup.engagement,
        )
        .await;
    });

    let _scheduler = scheduler::build_scheduler(state.clone(), &config.feed_refresh_cron).await?;

    let auth = AuthState::from_env(matches!(config.env, Environment::Development))?;
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "folio-server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CounterStore>> {
    match config.store {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory counter store; engagement data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = folio_db::connect_pool_from_config(config).await?;
            folio_db::run_migrations(&pool).await?;
            Ok(Arc::new(folio_db::PgCounterStore::new(pool)))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
