//! `posts`: list the catalog the way the site would.

use std::collections::HashMap;

use folio_core::{AppConfig, PostCatalog, PostQuery, PostSort};

use crate::stats::connect_engagement;

/// # Errors
///
/// Returns an error if the content directory cannot be loaded, or if
/// `popular` ordering is requested and the counter database is unreachable.
pub(crate) async fn run_posts(
    config: &AppConfig,
    tag: Option<String>,
    q: Option<String>,
    sort: PostSort,
) -> anyhow::Result<()> {
    let catalog = PostCatalog::load(&config.content_dir)?;

    let popularity = if sort == PostSort::Popular {
        let engagement = connect_engagement(config).await?;
        let slugs: Vec<String> = catalog.published().map(|p| p.slug.clone()).collect();
        Some(engagement.get_views_for_slugs(&slugs).await)
    } else {
        None
    };

    let mut query = PostQuery {
        tag,
        q,
        sort,
        per_page: Some(usize::MAX),
        ..PostQuery::default()
    };
    let mut rows = Vec::new();
    loop {
        let page = catalog.query(&query, popularity.as_ref());
        let last = page.page >= page.total_pages;
        rows.extend(page.items);
        if last {
            break;
        }
        query.page = Some(page.page + 1);
    }

    if rows.is_empty() {
        println!("no posts match");
        return Ok(());
    }

    print_rows(&rows, popularity.as_ref());
    Ok(())
}

fn print_rows(rows: &[folio_core::PostMeta], popularity: Option<&HashMap<String, u64>>) {
    println!("{:<12}{:<40}{:<6}TITLE", "DATE", "SLUG", "MIN");
    for post in rows {
        let views = popularity
            .and_then(|p| p.get(&post.slug))
            .map(|v| format!(" ({v} views)"))
            .unwrap_or_default();
        println!(
            "{:<12}{:<40}{:<6}{}{}",
            post.published_at.to_string(),
            post.slug,
            post.reading_time_minutes,
            post.title,
            views
        );
    }
}
