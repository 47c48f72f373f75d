// Error handling tests

use axum::http::StatusCode;
use axum::response::IntoResponse;
use pace_pro_sw::error::WorkerError;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        WorkerError::Config("bad origin".to_string()),
        WorkerError::Network("connection refused".to_string()),
        WorkerError::Cache("bucket unreadable".to_string()),
        WorkerError::Install("manifest missing".to_string()),
        WorkerError::NoResponse("http://app.test/data.json".to_string()),
        WorkerError::Host("no display".to_string()),
        WorkerError::InvalidRequest("bad message".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_no_response_names_the_request() {
    let error = WorkerError::NoResponse("http://app.test/data.json".to_string());
    assert!(format!("{}", error).contains("/data.json"));
}

#[test]
fn test_only_transport_errors_are_network_errors() {
    assert!(WorkerError::Network("down".to_string()).is_network());
    assert!(!WorkerError::Cache("full".to_string()).is_network());
    assert!(!WorkerError::NoResponse("x".to_string()).is_network());
}

#[test]
fn test_url_parse_error_converts() {
    let err: WorkerError = url::Url::parse("not a url").unwrap_err().into();
    assert!(matches!(err, WorkerError::InvalidUrl(_)));
}

#[test]
fn test_status_codes() {
    let cases = vec![
        (WorkerError::InvalidRequest("x".to_string()), StatusCode::BAD_REQUEST),
        (WorkerError::Network("x".to_string()), StatusCode::BAD_GATEWAY),
        (WorkerError::NoResponse("x".to_string()), StatusCode::BAD_GATEWAY),
        (WorkerError::Install("x".to_string()), StatusCode::SERVICE_UNAVAILABLE),
        (WorkerError::Cache("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        (WorkerError::Internal("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, expected) in cases {
        assert_eq!(error.into_response().status(), expected);
    }
}

#[tokio::test]
async fn test_error_body_shape() {
    let response = WorkerError::NoResponse("http://app.test/x".to_string()).into_response();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["type"], "error");
    assert_eq!(json["error"]["type"], "network_error");
    assert!(json["error"]["message"].as_str().unwrap().contains("http://app.test/x"));
}
