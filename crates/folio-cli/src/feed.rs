//! `feed`: run one aggregation pass and print it.

use folio_core::{filter_by_source, ActivityItem, ActivitySource, AppConfig, PostCatalog};
use folio_feeds::FeedAggregator;

/// Blog posts count as local items when the content directory loads; a
/// missing directory only drops them from the output.
fn local_items(config: &AppConfig) -> Vec<ActivityItem> {
    match PostCatalog::load(&config.content_dir) {
        Ok(catalog) => catalog.activities(),
        Err(e) => {
            tracing::warn!(
                dir = %config.content_dir.display(),
                error = %e,
                "could not load posts; showing external sources only"
            );
            Vec::new()
        }
    }
}

/// # Errors
///
/// Returns an error if the HTTP clients cannot be built or JSON output
/// fails to serialize.
pub(crate) async fn run_feed(
    config: &AppConfig,
    sources: &[ActivitySource],
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let aggregator = FeedAggregator::from_app_config(config)?;
    let report = aggregator.collect(local_items(config)).await;

    for failure in &report.failures {
        eprintln!("warning: {} failed: {}", failure.source, failure.error);
    }

    let mut items = filter_by_source(&report.items, sources);
    items.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("no activity found");
        return Ok(());
    }

    println!("{:<18}{:<11}{:<11}TITLE", "WHEN", "SOURCE", "VERB");
    for item in &items {
        let when = item.timestamp.format("%Y-%m-%d %H:%M").to_string();
        let verb = format!("{:?}", item.verb).to_lowercase();
        println!(
            "{:<18}{:<11}{:<11}{}",
            when,
            item.source.as_str(),
            verb,
            item.title
        );
    }

    Ok(())
}
