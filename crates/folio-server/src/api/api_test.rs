use std::sync::Arc;
use std::time::Duration;

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use chrono::{NaiveDate, TimeZone, Utc};
use folio_core::{ActivityItem, ActivityMetadata, ActivitySource, ActivityVerb, PostMeta};
use folio_engagement::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;

use super::*;

fn post(slug: &str, day: u32, tags: &[&str], draft: bool) -> PostMeta {
    PostMeta {
        slug: slug.to_string(),
        title: format!("Post {slug}"),
        summary: Some(format!("About {slug}")),
        published_at: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
        updated_at: None,
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        category: Some("notes".to_string()),
        draft,
        featured: day == 3,
        cover_image: None,
        word_count: 600,
        reading_time_minutes: 3,
    }
}

fn push(id: &str, minute: u32) -> ActivityItem {
    ActivityItem {
        id: id.to_string(),
        source: ActivitySource::Github,
        verb: ActivityVerb::Pushed,
        title: "Pushed 1 commit to me/folio".to_string(),
        description: None,
        href: "https://github.com/me/folio".to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 1, 10, 12, minute, 0).unwrap(),
        metadata: ActivityMetadata {
            thread_key: Some("me/folio".to_string()),
            ..ActivityMetadata::default()
        },
    }
}

fn test_state() -> AppState {
    let catalog = PostCatalog::from_posts(vec![
        post("first-steps", 1, &["rust"], false),
        post("async-notes", 2, &["rust", "async"], false),
        post("featured-piece", 3, &["async"], false),
        post("secret-draft", 4, &["rust"], true),
    ])
    .unwrap();

    let mut items = catalog.activities();
    items.push(push("github:1", 5));
    items.push(push("github:2", 20));
    folio_core::sort_newest_first(&mut items);

    AppState {
        engagement: Engagement::new(Arc::new(MemoryStore::new())),
        feed: FeedCache::with_items(items),
        catalog: Arc::new(catalog),
        aggregator: Arc::new(FeedAggregator::new(50)),
        site: Arc::new(SiteInfo {
            url: "https://folio.example".to_string(),
            title: "Folio".to_string(),
        }),
    }
}

fn app_with(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    build_app(state, auth, rate_limit)
}

fn app(state: AppState) -> Router {
    app_with(
        state,
        AuthState::from_keys("", true).unwrap(),
        default_rate_limit_state(),
    )
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json parse")
    };
    (status, json)
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("store_unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("anything_else", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[tokio::test]
async fn health_reports_store_and_echoes_request_id() {
    let app = app(test_state());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-abc"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["posts"], 4);
    assert_eq!(json["meta"]["request_id"], "req-abc");
}

#[tokio::test]
async fn list_posts_hides_drafts_and_attaches_views() {
    let state = test_state();
    state.engagement.increment_post_views("async-notes").await.unwrap();
    state.engagement.increment_post_views("async-notes").await.unwrap();
    let app = app(state);

    let (status, json) = send(&app, "GET", "/api/v1/posts?tag=rust", None).await;
    assert_eq!(status, StatusCode::OK);
    let items = json["data"]["items"].as_array().unwrap();
    let slugs: Vec<&str> = items.iter().map(|p| p["slug"].as_str().unwrap()).collect();
    assert_eq!(slugs, vec!["async-notes", "first-steps"]);
    assert_eq!(items[0]["views"], 2);
    assert_eq!(items[1]["views"], 0);
    assert_eq!(json["data"]["total"], 2);
}

#[tokio::test]
async fn list_posts_sorts_by_popularity() {
    let state = test_state();
    for _ in 0..3 {
        state.engagement.increment_post_views("first-steps").await.unwrap();
    }
    let app = app(state);

    let (status, json) = send(&app, "GET", "/api/v1/posts?sort=popular&per_page=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["items"][0]["slug"], "first-steps");
    assert_eq!(json["data"]["items"][0]["views"], 3);
    assert_eq!(json["data"]["total_pages"], 3);
}

#[tokio::test]
async fn featured_filter_and_sidebar() {
    let app = app(test_state());

    let (_, json) = send(&app, "GET", "/api/v1/posts?featured=true", None).await;
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["slug"], "featured-piece");

    let (status, json) = send(&app, "GET", "/api/v1/posts/sidebar", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["categories"], serde_json::json!(["notes"]));
    assert_eq!(json["data"]["archive"][0]["count"], 3);
}

#[tokio::test]
async fn post_detail_includes_stats_and_neighbours() {
    let app = app(test_state());

    let (status, json) = send(&app, "GET", "/api/v1/posts/async-notes", None).await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["post"]["slug"], "async-notes");
    assert_eq!(data["stats"]["views"], 0);
    assert_eq!(data["older"]["slug"], "first-steps");
    assert_eq!(data["newer"]["slug"], "featured-piece");
    let related: Vec<&str> = data["related"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["slug"].as_str().unwrap())
        .collect();
    assert!(related.contains(&"first-steps"));
    assert!(!related.contains(&"secret-draft"));
}

#[tokio::test]
async fn unknown_and_draft_posts_are_not_found() {
    let app = app(test_state());

    for uri in [
        "/api/v1/posts/nope",
        "/api/v1/posts/secret-draft",
        "/api/v1/posts/secret-draft/stats",
    ] {
        let (status, json) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(json["error"]["code"], "not_found");
    }

    let (status, _) = send(&app, "POST", "/api/v1/posts/nope/views", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn views_likes_and_bookmarks_round_trip() {
    let app = app(test_state());

    let (status, json) = send(&app, "POST", "/api/v1/posts/first-steps/views", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["count"], 1);
    send(&app, "POST", "/api/v1/posts/first-steps/views", None).await;

    let (_, json) = send(&app, "POST", "/api/v1/posts/first-steps/likes", None).await;
    assert_eq!(json["data"]["count"], 1);
    let (_, json) = send(&app, "DELETE", "/api/v1/posts/first-steps/likes", None).await;
    assert_eq!(json["data"]["count"], 0);
    let (_, json) = send(&app, "DELETE", "/api/v1/posts/first-steps/likes", None).await;
    assert_eq!(json["data"]["count"], 0);

    let (_, json) = send(&app, "POST", "/api/v1/posts/first-steps/bookmarks", None).await;
    assert_eq!(json["data"]["count"], 1);

    let (status, json) = send(&app, "GET", "/api/v1/posts/first-steps/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["views"], 2);
    assert_eq!(json["data"]["views_24h"], 2);
    assert_eq!(json["data"]["views_90d"], 2);
    assert_eq!(json["data"]["likes"], 0);
    assert_eq!(json["data"]["bookmarks"], 1);
}

#[tokio::test]
async fn daily_views_default_to_ninety_days() {
    let app = app(test_state());
    send(&app, "POST", "/api/v1/posts/first-steps/views", None).await;

    let (status, json) = send(&app, "GET", "/api/v1/posts/first-steps/views/daily", None).await;
    assert_eq!(status, StatusCode::OK);
    let days = json["data"]["days"].as_array().unwrap();
    assert_eq!(days.len(), 90);
    assert_eq!(days.last().unwrap()["count"], 1);

    let (_, json) = send(
        &app,
        "GET",
        "/api/v1/posts/first-steps/views/daily?days=7",
        None,
    )
    .await;
    assert_eq!(json["data"]["days"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn batch_stats_limits_slug_count() {
    let state = test_state();
    state.engagement.increment_post_views("first-steps").await.unwrap();
    let app = app(state);

    let (status, json) = send(
        &app,
        "GET",
        "/api/v1/stats?slugs=first-steps,async-notes,Not%20Valid",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["data"],
        serde_json::json!({ "async-notes": 0, "first-steps": 1 })
    );

    let many: Vec<String> = (0..101).map(|i| format!("post-{i}")).collect();
    let (status, json) = send(
        &app,
        "GET",
        &format!("/api/v1/stats?slugs={}", many.join(",")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn reading_progress_is_recorded_and_listed() {
    let app = app(test_state());
    let reader = "reader-0001";

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/v1/reading/{reader}/first-steps"),
        Some(serde_json::json!({ "percent": 140 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["percent"], 100);

    let (status, json) = send(&app, "GET", &format!("/api/v1/reading/{reader}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["slug"], "first-steps");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/v1/reading/short/first-steps",
        Some(serde_json::json!({ "percent": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/v1/reading/{reader}/secret-draft"),
        Some(serde_json::json!({ "percent": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn activity_pages_and_filters_by_source() {
    let app = app(test_state());

    let (status, json) = send(&app, "GET", "/api/v1/activity?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"]["next_cursor"], 2);

    let (_, json) = send(&app, "GET", "/api/v1/activity?source=github", None).await;
    let items = json["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i["source"] == "github"));
    assert!(json["data"]["next_cursor"].is_null());

    let (status, json) = send(&app, "GET", "/api/v1/activity?source=myspace", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn grouped_activity_threads_pushes() {
    let app = app(test_state());

    let (status, json) = send(
        &app,
        "GET",
        "/api/v1/activity/grouped?mode=thread&source=github",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["mode"], "thread");
    let groups = json["data"]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["items"].as_array().unwrap().len(), 2);

    let (status, json) = send(&app, "GET", "/api/v1/activity/grouped", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["mode"], "time");
}

#[tokio::test]
async fn rss_lists_published_posts() {
    let app = app(test_state());
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/rss.xml").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/rss+xml; charset=utf-8"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains("https://folio.example/blog/first-steps"));
    assert!(!xml.contains("secret-draft"));
}

#[tokio::test]
async fn admin_refresh_requires_bearer_token() {
    let app = app_with(
        test_state(),
        AuthState::from_keys("admin-token", false).unwrap(),
        default_rate_limit_state(),
    );

    let (status, json) = send(&app, "POST", "/api/v1/admin/feed/refresh", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/admin/feed/refresh")
                .header("authorization", "Bearer admin-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    // No external sources configured: only the three published posts remain.
    assert_eq!(json["data"]["items"], 3);

    let (_, json) = send(&app, "GET", "/api/v1/activity?source=github", None).await;
    assert!(json["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn engagement_routes_are_rate_limited() {
    let app = app_with(
        test_state(),
        AuthState::from_keys("", true).unwrap(),
        RateLimitState::new(2, Duration::from_secs(60)),
    );

    for _ in 0..2 {
        let (status, _) = send(&app, "POST", "/api/v1/posts/first-steps/views", None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, json) = send(&app, "POST", "/api/v1/posts/first-steps/views", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"]["code"], "rate_limited");

    // Reads are not limited.
    let (status, _) = send(&app, "GET", "/api/v1/posts", None).await;
    assert_eq!(status, StatusCode::OK);
}

async fn record_view_from(
    app: &Router,
    peer: SocketAddr,
    forwarded_for: Option<&str>,
) -> StatusCode {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/posts/first-steps/views")
        .extension(ConnectInfo(peer));
    if let Some(value) = forwarded_for {
        builder = builder.header("x-forwarded-for", value);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).expect("request"))
        .await
        .expect("response")
        .status()
}

#[tokio::test]
async fn rate_limit_is_kept_per_client() {
    let app = app_with(
        test_state(),
        AuthState::from_keys("", true).unwrap(),
        RateLimitState::new(2, Duration::from_secs(60)),
    );

    for i in 0..130u8 {
        let peer = SocketAddr::from(([10, 0, 0, i], 40_000));
        assert_eq!(record_view_from(&app, peer, None).await, StatusCode::OK);
    }

    let busy = SocketAddr::from(([192, 0, 2, 1], 40_000));
    assert_eq!(record_view_from(&app, busy, None).await, StatusCode::OK);
    assert_eq!(record_view_from(&app, busy, None).await, StatusCode::OK);
    assert_eq!(
        record_view_from(&app, busy, None).await,
        StatusCode::TOO_MANY_REQUESTS
    );

    let (_, json) = send(&app, "GET", "/api/v1/posts/first-steps/stats", None).await;
    assert_eq!(json["data"]["views"], 132);
}

#[tokio::test]
async fn forwarded_clients_are_limited_separately_behind_trusted_proxy() {
    let limit = RateLimitState::new(1, Duration::from_secs(60)).trust_forwarded_for(true);
    let app = app_with(test_state(), AuthState::from_keys("", true).unwrap(), limit);
    let proxy = SocketAddr::from(([127, 0, 0, 1], 8080));

    assert_eq!(
        record_view_from(&app, proxy, Some("198.51.100.7")).await,
        StatusCode::OK
    );
    assert_eq!(
        record_view_from(&app, proxy, Some("198.51.100.8")).await,
        StatusCode::OK
    );
    assert_eq!(
        record_view_from(&app, proxy, Some("198.51.100.7")).await,
        StatusCode::TOO_MANY_REQUESTS
    );
}
