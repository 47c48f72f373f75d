// Error types for the PACE PRO offline worker

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Install failed: {0}")]
    Install(String),

    #[error("No response available for {0}")]
    NoResponse(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkerError {
    /// True when the error came from the transport rather than from the worker itself.
    pub fn is_network(&self) -> bool {
        matches!(self, WorkerError::Network(_))
    }
}

// Convert WorkerError to HTTP responses for Axum
impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            WorkerError::InvalidRequest(_) | WorkerError::InvalidUrl(_) | WorkerError::Json(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            WorkerError::Network(_) | WorkerError::NoResponse(_) => {
                (StatusCode::BAD_GATEWAY, "network_error")
            }
            WorkerError::Install(_) => (StatusCode::SERVICE_UNAVAILABLE, "install_error"),
            WorkerError::Config(_) | WorkerError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            WorkerError::Cache(_) | WorkerError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "cache_error")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "api_error"),
        };

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
