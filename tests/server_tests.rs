// Router tests: page traffic and the /__sw control endpoints

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{test_config, Harness, APP_ORIGIN};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(harness: &Harness) -> Router {
    pace_pro_sw::server::create_router(test_config(), harness.worker.clone()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn post_json(uri: &str, value: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_activated_worker() {
    let harness = Harness::started().await;
    let response = router(&harness)
        .oneshot(Request::builder().uri("/__sw/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["state"], "activated");
    assert_eq!(json["precache"], "pace-pro-v1.0.0");
    assert_eq!(json["checks"]["cache_storage"]["status"], "ok");
}

#[tokio::test]
async fn test_health_before_start_is_degraded() {
    let harness = Harness::new();
    let response = router(&harness)
        .oneshot(Request::builder().uri("/__sw/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["state"], "parsed");
}

#[tokio::test]
async fn test_page_request_is_served_online() {
    let harness = Harness::started().await;
    let response = router(&harness)
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/html"
    );
    assert_eq!(&body_bytes(response).await[..], b"<html>shell</html>");
}

#[tokio::test]
async fn test_offline_navigation_is_served_the_shell() {
    let harness = Harness::started().await;
    harness.network.set_offline(true);

    let response = router(&harness)
        .oneshot(
            Request::builder()
                .uri("/historico?semana=3")
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], b"<html>shell</html>");
}

#[tokio::test]
async fn test_offline_asset_miss_is_bad_gateway() {
    let harness = Harness::started().await;
    harness.network.set_offline(true);

    let response = router(&harness)
        .oneshot(Request::builder().uri("/assets/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["type"], "network_error");
}

#[tokio::test]
async fn test_inactive_worker_passes_requests_through() {
    let harness = Harness::new();
    harness.network.ok(&format!("{}/ping", APP_ORIGIN), "pong");

    let response = router(&harness)
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body_bytes(response).await[..], b"pong");
}

#[tokio::test]
async fn test_message_endpoint() {
    let harness = Harness::started().await;
    harness.network.ok(&format!("{}/a.png", APP_ORIGIN), "a");

    let response = router(&harness)
        .oneshot(post_json("/__sw/message", json!({"type": "CACHE_URLS", "urls": ["/a.png"]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "cached", "entries": 1}));

    let response = router(&harness)
        .oneshot(post_json("/__sw/message", json!({"type": "NOPE"})))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!({"status": "ignored"}));
}

#[tokio::test]
async fn test_malformed_message_is_bad_request() {
    let harness = Harness::started().await;
    let response = router(&harness)
        .oneshot(post_json("/__sw/message", json!({"type": "CACHE_URLS", "urls": "not-a-list"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_push_and_click_endpoints() {
    let harness = Harness::new();

    let response = router(&harness)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/__sw/push")
                .body(Body::from("Intervalado 6x400m"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let shown = body_json(response).await;
    assert_eq!(shown["body"], "Intervalado 6x400m");
    assert_eq!(shown["tag"], "pace-pro-notification");

    let response = router(&harness)
        .oneshot(post_json("/__sw/notificationclick", json!({"action": "start"})))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"status": "opened", "url": format!("{}/", APP_ORIGIN)})
    );
    assert!(harness.host.snapshot().notifications.is_empty());
}

#[tokio::test]
async fn test_sync_endpoint() {
    let harness = Harness::new();
    let response = router(&harness)
        .oneshot(post_json("/__sw/sync", json!({"tag": "sync-training-data"})))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({"tag": "sync-training-data", "handled": true})
    );
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let harness = Harness::started().await;
    let response = router(&harness)
        .oneshot(Request::builder().uri("/__sw/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(response).await.to_vec()).unwrap();
    assert!(text.contains("lifecycle_events_total"));
    assert!(text.contains("cache_buckets_current"));
}
