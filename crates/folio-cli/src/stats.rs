//! `stats` and `prune`: read and maintain the Postgres counters directly.

use std::sync::Arc;

use folio_core::AppConfig;
use folio_engagement::{Engagement, PostStats};

pub(crate) async fn connect_engagement(config: &AppConfig) -> anyhow::Result<Engagement> {
    let pool = folio_db::connect_pool_from_config(config).await?;
    folio_db::run_migrations(&pool).await?;
    Ok(Engagement::new(Arc::new(folio_db::PgCounterStore::new(pool))))
}

fn cell(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing or the database is
/// unreachable.
pub(crate) async fn run_stats(config: &AppConfig, slugs: &[String]) -> anyhow::Result<()> {
    let engagement = connect_engagement(config).await?;

    println!(
        "{:<40}{:>8}{:>8}{:>8}{:>8}{:>11}",
        "SLUG", "VIEWS", "24H", "90D", "LIKES", "BOOKMARKS"
    );
    for slug in slugs {
        if !folio_core::is_valid_slug(slug) {
            eprintln!("skipping invalid slug '{slug}'");
            continue;
        }
        let PostStats {
            views,
            views_24h,
            views_90d,
            likes,
            bookmarks,
        } = engagement.get_post_stats(slug).await;
        println!(
            "{:<40}{:>8}{:>8}{:>8}{:>8}{:>11}",
            slug,
            cell(views),
            cell(views_24h),
            cell(views_90d),
            cell(likes),
            cell(bookmarks)
        );
    }

    Ok(())
}

/// # Errors
///
/// Returns an error if the database is unreachable or the cleanup fails.
pub(crate) async fn run_prune(config: &AppConfig) -> anyhow::Result<()> {
    let engagement = connect_engagement(config).await?;
    let Some(removed) = engagement.prune_all_history().await else {
        anyhow::bail!("view history cleanup failed; see logs");
    };
    println!("removed {removed} expired view events");
    Ok(())
}
