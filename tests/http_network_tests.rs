// HttpNetwork against a local mock server

use pace_pro_sw::config::NetworkConfig;
use pace_pro_sw::network::{FetchRequest, HttpNetwork, Network};
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};

fn network() -> HttpNetwork {
    let config = NetworkConfig {
        timeout_seconds: 5,
        connect_timeout_seconds: 2,
        ..NetworkConfig::default()
    };
    HttpNetwork::new(&config).unwrap()
}

#[tokio::test]
async fn test_fetch_returns_status_headers_and_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/manifest.json")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/manifest+json")
        .with_body("{\"name\":\"PACE PRO\"}")
        .create_async()
        .await;

    let request = FetchRequest::get_str(&format!("{}/manifest.json", server.url()))
        .unwrap()
        .with_header(ACCEPT, "application/json")
        .unwrap();
    let response = network().fetch(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type(), Some("application/manifest+json"));
    assert_eq!(&response.body[..], b"{\"name\":\"PACE PRO\"}");
}

#[tokio::test]
async fn test_error_status_is_not_a_transport_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/gone")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;

    let request = FetchRequest::get_str(&format!("{}/gone", server.url())).unwrap();
    let response = network().fetch(&request).await.unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_request_body_is_forwarded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/sessions")
        .match_body("{\"km\":5}")
        .with_status(201)
        .create_async()
        .await;

    let url = url::Url::parse(&format!("{}/api/sessions", server.url())).unwrap();
    let request = FetchRequest::new(Method::POST, url).with_body("{\"km\":5}");
    let response = network().fetch(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let request = FetchRequest::get_str("http://127.0.0.1:1/").unwrap();
    let err = network().fetch(&request).await.unwrap_err();
    assert!(err.is_network());
    assert!(matches!(err, pace_pro_sw::error::WorkerError::Network(_)));
}

#[tokio::test]
async fn test_redirect_is_returned_not_followed() {
    let mut server = mockito::Server::new_async().await;
    let login = server
        .mock("GET", "/login")
        .with_status(200)
        .with_body("LOGIN PAGE")
        .expect(0)
        .create_async()
        .await;
    server
        .mock("GET", "/old")
        .with_status(302)
        .with_header("location", "/login")
        .create_async()
        .await;

    let request = FetchRequest::get_str(&format!("{}/old", server.url())).unwrap();
    let response = network().fetch(&request).await.unwrap();

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.headers.get("location").unwrap(), "/login");
    assert!(response.body.is_empty());
    login.assert_async().await;
}

#[tokio::test]
async fn test_worker_forwards_redirect_and_does_not_cache_it() {
    use pace_pro_sw::cache::{CacheStorage, MemoryCacheStorage, RequestKey};
    use pace_pro_sw::config::AppConfig;
    use pace_pro_sw::host::LocalHost;
    use pace_pro_sw::worker::{EventOutcome, FetchResponse, ServiceWorker, WorkerEvent};
    use std::sync::Arc;

    let mut server = mockito::Server::new_async().await;
    for path in ["/", "/index.html", "/manifest.json"] {
        server.mock("GET", path).with_status(200).with_body("ok").create_async().await;
    }
    server
        .mock("GET", "/old")
        .with_status(302)
        .with_header("location", "/login")
        .create_async()
        .await;
    server
        .mock("GET", "/login")
        .with_status(200)
        .with_body("LOGIN PAGE")
        .create_async()
        .await;

    let mut config = AppConfig::default();
    config.worker.app_origin = server.url();
    let storage = Arc::new(MemoryCacheStorage::new());
    let worker = ServiceWorker::from_config(
        &config,
        storage.clone(),
        Arc::new(network()),
        Arc::new(LocalHost::default()),
    )
    .unwrap();
    worker.start().await.unwrap();

    let old = url::Url::parse(&format!("{}/old", server.url())).unwrap();
    let outcome = worker
        .dispatch(WorkerEvent::Fetch(FetchRequest::get(old.clone())))
        .await
        .unwrap();
    match outcome {
        EventOutcome::Fetch(FetchResponse::Respond { response, .. }) => {
            assert_eq!(response.status, StatusCode::FOUND);
            assert_eq!(response.headers.get("location").unwrap(), "/login");
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    worker.manager().wait_for_background_tasks().await;
    let precache = storage.open(worker.manager().names().precache()).await.unwrap();
    assert!(precache.lookup(&RequestKey::get(old)).await.unwrap().is_none());
}
