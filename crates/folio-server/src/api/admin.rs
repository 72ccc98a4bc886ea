use axum::{extract::State, Extension, Json};

use super::{ApiResponse, AppState};
use crate::feed_cache::{refresh, RefreshSummary};
use crate::middleware::RequestId;

/// Re-aggregate the activity feed now instead of waiting for the schedule.
pub(super) async fn refresh_feed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<RefreshSummary>> {
    tracing::info!(request_id = %req_id.0, "manual feed refresh requested");
    let summary = refresh(
        &state.feed,
        &state.aggregator,
        &state.catalog,
        &state.engagement,
    )
    .await;
    ApiResponse::new(req_id.0, summary)
}
