use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{post_not_found, store_unavailable, ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

const MAX_BATCH_SLUGS: usize = 100;

#[derive(Debug, Clone, Copy)]
enum Counter {
    Views,
    Likes,
    Bookmarks,
}

#[derive(Debug, Clone, Copy)]
enum Change {
    Increment,
    Decrement,
}

#[derive(Debug, Serialize)]
pub(super) struct CounterValue {
    pub slug: String,
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct BatchQuery {
    pub slugs: Option<String>,
}

async fn apply(
    state: &AppState,
    req_id: RequestId,
    slug: String,
    counter: Counter,
    change: Change,
) -> Result<Json<ApiResponse<CounterValue>>, ApiError> {
    if !state.catalog.contains(&slug) {
        return Err(post_not_found(req_id.0, &slug));
    }

    let engagement = &state.engagement;
    let result = match (counter, change) {
        (Counter::Views, _) => engagement.increment_post_views(&slug).await,
        (Counter::Likes, Change::Increment) => engagement.increment_likes(&slug).await,
        (Counter::Likes, Change::Decrement) => engagement.decrement_likes(&slug).await,
        (Counter::Bookmarks, Change::Increment) => engagement.increment_bookmarks(&slug).await,
        (Counter::Bookmarks, Change::Decrement) => engagement.decrement_bookmarks(&slug).await,
    };

    match result {
        Some(count) => Ok(ApiResponse::new(req_id.0, CounterValue { slug, count })),
        None => Err(store_unavailable(req_id.0)),
    }
}

pub(super) async fn record_view(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CounterValue>>, ApiError> {
    apply(&state, req_id, slug, Counter::Views, Change::Increment).await
}

pub(super) async fn like(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CounterValue>>, ApiError> {
    apply(&state, req_id, slug, Counter::Likes, Change::Increment).await
}

pub(super) async fn unlike(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CounterValue>>, ApiError> {
    apply(&state, req_id, slug, Counter::Likes, Change::Decrement).await
}

pub(super) async fn bookmark(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CounterValue>>, ApiError> {
    apply(&state, req_id, slug, Counter::Bookmarks, Change::Increment).await
}

pub(super) async fn unbookmark(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CounterValue>>, ApiError> {
    apply(&state, req_id, slug, Counter::Bookmarks, Change::Decrement).await
}

/// Total views for a comma-separated slug list. Unknown slugs report 0;
/// malformed ones are left out.
pub(super) async fn batch_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<ApiResponse<BTreeMap<String, u64>>>, ApiError> {
    let mut slugs: Vec<String> = query
        .slugs
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    slugs.sort();
    slugs.dedup();

    if slugs.len() > MAX_BATCH_SLUGS {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("at most {MAX_BATCH_SLUGS} slugs per request"),
        ));
    }

    let views = state.engagement.get_views_for_slugs(&slugs).await;
    Ok(ApiResponse::new(req_id.0, views.into_iter().collect()))
}
