use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use folio_core::{
    filter_by_source, group_by_time, paginate, thread_activities, ActivityGroup, ActivityPage,
    ActivitySource, ActivityThread,
};
use serde::{Deserialize, Serialize};

use super::{normalize_limit, ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

/// Pushes to one repository more than this far apart start a new thread.
const THREAD_WINDOW_HOURS: i64 = 6;

#[derive(Debug, Deserialize)]
pub(super) struct ActivityQuery {
    /// Comma-separated source names; empty means every source.
    pub source: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum GroupMode {
    #[default]
    Time,
    Thread,
}

#[derive(Debug, Deserialize)]
pub(super) struct GroupedQuery {
    pub source: Option<String>,
    #[serde(default)]
    pub mode: GroupMode,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", content = "groups", rename_all = "lowercase")]
pub(super) enum GroupedActivity {
    Time(Vec<ActivityGroup>),
    Thread(Vec<ThreadItem>),
}

#[derive(Debug, Serialize)]
pub(super) struct ThreadItem {
    pub summary: String,
    #[serde(flatten)]
    pub thread: ActivityThread,
}

fn parse_sources(request_id: &str, raw: Option<&str>) -> Result<Vec<ActivitySource>, ApiError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ActivitySource>()
                .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))
        })
        .collect()
}

fn limit_to_usize(limit: Option<i64>) -> usize {
    usize::try_from(normalize_limit(limit)).unwrap_or(1)
}

pub(super) async fn list_activity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<ActivityPage>>, ApiError> {
    let sources = parse_sources(&req_id.0, query.source.as_deref())?;
    let snapshot = state.feed.snapshot().await;
    let items = filter_by_source(&snapshot.items, &sources);
    let page = paginate(&items, query.cursor, limit_to_usize(query.limit));

    Ok(ApiResponse::new(req_id.0, page))
}

pub(super) async fn grouped_activity(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<GroupedQuery>,
) -> Result<Json<ApiResponse<GroupedActivity>>, ApiError> {
    let sources = parse_sources(&req_id.0, query.source.as_deref())?;
    let snapshot = state.feed.snapshot().await;
    let mut items = filter_by_source(&snapshot.items, &sources);
    items.truncate(limit_to_usize(query.limit));

    let grouped = match query.mode {
        GroupMode::Time => GroupedActivity::Time(group_by_time(&items, Utc::now())),
        GroupMode::Thread => GroupedActivity::Thread(
            thread_activities(&items, Duration::hours(THREAD_WINDOW_HOURS))
                .into_iter()
                .map(|thread| ThreadItem {
                    summary: thread.summary(),
                    thread,
                })
                .collect(),
        ),
    };

    Ok(ApiResponse::new(req_id.0, grouped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sources_accepts_lists_and_rejects_unknown() {
        assert_eq!(
            parse_sources("r", Some("blog, github")).unwrap(),
            vec![ActivitySource::Blog, ActivitySource::Github]
        );
        assert!(parse_sources("r", None).unwrap().is_empty());
        assert!(parse_sources("r", Some(" , ")).unwrap().is_empty());

        let err = parse_sources("r", Some("myspace")).unwrap_err();
        assert_eq!(err.error.code, "validation_error");
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(limit_to_usize(None), 50);
        assert_eq!(limit_to_usize(Some(-3)), 1);
        assert_eq!(limit_to_usize(Some(10_000)), 200);
    }
}
