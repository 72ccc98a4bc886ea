mod activity;
mod admin;
mod engagement;
mod posts;
mod reading;
mod rss;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use folio_core::PostCatalog;
use folio_engagement::Engagement;
use folio_feeds::FeedAggregator;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::feed_cache::FeedCache;
use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

/// Site identity used when rendering absolute links.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub url: String,
    pub title: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engagement: Engagement,
    pub catalog: Arc<PostCatalog>,
    pub feed: FeedCache,
    pub aggregator: Arc<FeedAggregator>,
    pub site: Arc<SiteInfo>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    store: &'static str,
    posts: usize,
    feed_refreshed_at: Option<DateTime<Utc>>,
    feed_failures: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "store_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn post_not_found(request_id: String, slug: &str) -> ApiError {
    ApiError::new(request_id, "not_found", format!("post '{slug}' not found"))
}

/// The counter store failed; engagement operations already logged the cause.
pub(super) fn store_unavailable(request_id: String) -> ApiError {
    ApiError::new(
        request_id,
        "store_unavailable",
        "engagement store is unavailable",
    )
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/activity", get(activity::list_activity))
        .route("/api/v1/activity/grouped", get(activity::grouped_activity))
        .route("/api/v1/posts", get(posts::list_posts))
        .route("/api/v1/posts/sidebar", get(posts::sidebar))
        .route("/api/v1/posts/{slug}", get(posts::get_post))
        .route("/api/v1/posts/{slug}/stats", get(posts::post_stats))
        .route("/api/v1/posts/{slug}/views/daily", get(posts::daily_views))
        .route("/api/v1/stats", get(engagement::batch_stats))
        .route("/api/v1/reading/{reader}", get(reading::list_progress))
        .route("/rss.xml", get(rss::rss_feed))
}

fn engagement_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/posts/{slug}/views", post(engagement::record_view))
        .route(
            "/api/v1/posts/{slug}/likes",
            post(engagement::like).delete(engagement::unlike),
        )
        .route(
            "/api/v1/posts/{slug}/bookmarks",
            post(engagement::bookmark).delete(engagement::unbookmark),
        )
        .route(
            "/api/v1/reading/{reader}/{slug}",
            put(reading::record_progress),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

fn admin_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/feed/refresh", post(admin::refresh_feed))
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .merge(public_router())
        .merge(engagement_router(rate_limit))
        .merge(admin_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let snapshot = state.feed.snapshot().await;
    let (feed_refreshed_at, feed_failures) = (snapshot.refreshed_at, snapshot.failures.len());
    let posts = state.catalog.len();

    if state.engagement.is_healthy().await {
        (
            StatusCode::OK,
            ApiResponse::new(
                req_id.0,
                HealthData {
                    status: "ok",
                    store: "ok",
                    posts,
                    feed_refreshed_at,
                    feed_failures,
                },
            ),
        )
    } else {
        tracing::warn!("health check: counter store unavailable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            ApiResponse::new(
                req_id.0,
                HealthData {
                    status: "degraded",
                    store: "unavailable",
                    posts,
                    feed_refreshed_at,
                    feed_failures,
                },
            ),
        )
    }
}

/// 120 engagement writes per client per minute.
pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::from_env(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
