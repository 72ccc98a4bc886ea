//! `devto`: quick look at a DEV.to profile's articles.

use folio_core::AppConfig;
use folio_feeds::{DevtoArticle, DevtoClient, HttpConfig};

const TITLE_WIDTH: usize = 60;

fn title_cell(title: &str) -> String {
    if title.chars().count() <= TITLE_WIDTH {
        return title.to_string();
    }
    let mut cut: String = title.chars().take(TITLE_WIDTH - 1).collect();
    cut.push('…');
    cut
}

/// # Errors
///
/// Returns an error for a malformed username or a failed request.
pub(crate) async fn run_devto(config: &AppConfig, username: &str) -> anyhow::Result<()> {
    let client = DevtoClient::new(
        HttpConfig::from_app_config(config),
        config.devto_api_key.clone(),
    )?;
    let mut articles: Vec<DevtoArticle> = client.fetch_article_metrics(username).await?;

    // Page views are only visible to the owner of the API key.
    if config.devto_api_key.is_some()
        && config.devto_username.as_deref() == Some(username)
    {
        match client.fetch_my_articles().await {
            Ok(mine) => articles = mine,
            Err(e) => tracing::warn!(error = %e, "could not load page views; showing public data"),
        }
    }

    if articles.is_empty() {
        println!("no published articles for '{username}'");
        return Ok(());
    }

    println!(
        "{:<12}{:>10}{:>10}{:>10}  TITLE",
        "PUBLISHED", "REACTIONS", "COMMENTS", "VIEWS"
    );
    for article in &articles {
        let published = article
            .published_at
            .map_or_else(|| "draft".to_string(), |d| d.format("%Y-%m-%d").to_string());
        let views = article
            .page_views_count
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        println!(
            "{:<12}{:>10}{:>10}{:>10}  {}",
            published,
            article.public_reactions_count,
            article.comments_count,
            views,
            title_cell(&article.title)
        );
    }

    Ok(())
}
