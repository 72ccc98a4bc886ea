//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring feed refresh and view-history cleanup.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;
use crate::feed_cache;

const DEFAULT_PRUNE_CRON: &str = "0 30 3 * * *";

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    state: AppState,
    feed_refresh_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_feed_refresh_job(&scheduler, state.clone(), feed_refresh_cron).await?;
    register_prune_job(&scheduler, state).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Re-aggregate every external source on `cron` and swap the result into
/// the shared feed cache.
async fn register_feed_refresh_job(
    scheduler: &JobScheduler,
    state: AppState,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let state = state.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting feed refresh");
            let summary = feed_cache::refresh(
                &state.feed,
                &state.aggregator,
                &state.catalog,
                &state.engagement,
            )
            .await;
            for failure in &summary.failures {
                tracing::warn!(
                    source = %failure.source,
                    error = %failure.error,
                    "scheduler: feed source failed"
                );
            }
            tracing::info!(items = summary.items, "scheduler: feed refresh complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered feed_refresh job");
    Ok(())
}

/// Daily trim of view events older than the retention window.
///
/// Runs at 03:30 UTC unless `FOLIO_PRUNE_CRON` overrides it.
async fn register_prune_job(
    scheduler: &JobScheduler,
    state: AppState,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("FOLIO_PRUNE_CRON").unwrap_or_else(|_| DEFAULT_PRUNE_CRON.to_string());
    let engagement = state.engagement;

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let engagement = engagement.clone();

        Box::pin(async move {
            tracing::info!("scheduler: starting view history prune");
            match engagement.prune_all_history().await {
                Some(removed) => {
                    tracing::info!(removed, "scheduler: view history prune complete");
                }
                None => tracing::error!("scheduler: view history prune failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered prune_history job");
    Ok(())
}
