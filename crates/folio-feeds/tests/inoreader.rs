//! Integration tests for `InoreaderClient` using wiremock HTTP mocks.

use folio_core::ActivityVerb;
use folio_feeds::{FeedError, HttpConfig, InoreaderClient};
use wiremock::matchers::{bearer_token, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> InoreaderClient {
    let config = HttpConfig {
        max_retries: 0,
        backoff_base_ms: 0,
        ..HttpConfig::default()
    };
    InoreaderClient::with_base_url(config, "access-token".to_string(), base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn fetch_stream_encodes_stream_id_and_maps_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream/contents/user%2F-%2Fstate%2Fcom.google%2Fstarred"))
        .and(query_param("n", "100"))
        .and(bearer_token("access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {
                    "id": "item-1",
                    "title": "A starred read",
                    "published": 1_736_000_000,
                    "canonical": [{ "href": "https://example.com/a" }],
                    "categories": ["user/-/state/com.google/starred"]
                },
                {
                    "id": "item-2",
                    "title": "No link",
                    "published": 1_736_000_000
                }
            ]
        })))
        .mount(&server)
        .await;

    let items = test_client(&server.uri())
        .fetch_stream("user/-/state/com.google/starred", 500)
        .await
        .expect("stream fetch");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "inoreader:item-1");
    assert_eq!(items[0].verb, ActivityVerb::Bookmarked);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .fetch_stream("user/-/state/com.google/read", 10)
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Unauthorized { .. }));
}

#[tokio::test]
async fn empty_stream_id_is_rejected() {
    let server = MockServer::start().await;
    let err = test_client(&server.uri())
        .fetch_stream("  ", 10)
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::InvalidInput { field: "stream_id", .. }));
}
