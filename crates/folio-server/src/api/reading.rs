use axum::{
    extract::{Path, State},
    Extension, Json,
};
use folio_core::ReadingProgress;
use folio_engagement::reader_hash;
use serde::Deserialize;

use super::{post_not_found, store_unavailable, ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct ProgressBody {
    pub percent: i64,
}

fn invalid_reader(request_id: String) -> ApiError {
    ApiError::new(
        request_id,
        "validation_error",
        "reader id must be 8-64 characters of [A-Za-z0-9_-]",
    )
}

pub(super) async fn record_progress(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((reader, slug)): Path<(String, String)>,
    Json(body): Json<ProgressBody>,
) -> Result<Json<ApiResponse<ReadingProgress>>, ApiError> {
    if reader_hash(&reader).is_none() {
        return Err(invalid_reader(req_id.0));
    }
    if !state.catalog.contains(&slug) {
        return Err(post_not_found(req_id.0, &slug));
    }

    match state
        .engagement
        .record_progress(&reader, &slug, body.percent)
        .await
    {
        Some(progress) => Ok(ApiResponse::new(req_id.0, progress)),
        None => Err(store_unavailable(req_id.0)),
    }
}

pub(super) async fn list_progress(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(reader): Path<String>,
) -> Result<Json<ApiResponse<Vec<ReadingProgress>>>, ApiError> {
    if reader_hash(&reader).is_none() {
        return Err(invalid_reader(req_id.0));
    }

    match state.engagement.list_progress(&reader).await {
        Some(list) => Ok(ApiResponse::new(req_id.0, list)),
        None => Err(store_unavailable(req_id.0)),
    }
}
