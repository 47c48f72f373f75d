// HTTP request handlers

use super::routes::AppState;
use crate::cache::ResponseSnapshot;
use crate::error::{Result, WorkerError};
use crate::network::FetchRequest;
use crate::utils::logging::redact_url;
use crate::worker::{
    ClickOutcome, EventOutcome, FetchResponse, MessageOutcome, NotificationClick, WorkerEvent,
    WorkerState,
};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub state: WorkerState,
    pub precache: String,
    pub runtime: String,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub tag: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let manager = state.worker.manager();
    let worker_state = state.worker.state();

    let (mut overall_status, lifecycle_check) = match worker_state {
        WorkerState::Activated => (
            HealthStatus::Healthy,
            HealthCheck {
                status: "ok".to_string(),
                message: "Worker active and intercepting requests".to_string(),
            },
        ),
        WorkerState::Redundant => (
            HealthStatus::Unhealthy,
            HealthCheck {
                status: "error".to_string(),
                message: "Worker is redundant; requests pass through untouched".to_string(),
            },
        ),
        other => (
            HealthStatus::Degraded,
            HealthCheck {
                status: "warning".to_string(),
                message: format!("Worker is {}", other),
            },
        ),
    };
    checks.insert("lifecycle".to_string(), lifecycle_check);

    // Check cache storage
    let storage = manager.storage();
    let storage_check = match storage.keys().await {
        Ok(buckets) => HealthCheck {
            status: "ok".to_string(),
            message: format!("{} backend, buckets: [{}]", storage.backend(), buckets.join(", ")),
        },
        Err(e) => {
            overall_status = HealthStatus::Unhealthy;
            HealthCheck {
                status: "error".to_string(),
                message: e.to_string(),
            }
        }
    };
    checks.insert("cache_storage".to_string(), storage_check);

    // Check configuration
    let config_check = HealthCheck {
        status: "ok".to_string(),
        message: format!("App origin: {}", manager.settings().app_origin),
    };
    checks.insert("configuration".to_string(), config_check);

    Json(HealthResponse {
        status: overall_status,
        state: worker_state,
        precache: manager.names().precache().to_string(),
        runtime: manager.names().runtime().to_string(),
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}

/// Fallback for every non-control request: hand it to the worker as a fetch
/// event and answer with whatever the worker decides.
pub async fn intercept_handler(State(state): State<AppState>, request: Request) -> Response {
    match intercept(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Fetch failed: {}", e);
            e.into_response()
        }
    }
}

async fn intercept(state: &AppState, request: Request) -> Result<Response> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.config.server.max_body_bytes)
        .await
        .map_err(|e| WorkerError::InvalidRequest(format!("failed to read request body: {}", e)))?;

    let url = request_url(&parts.uri, state)?;
    let fetch = FetchRequest {
        method: parts.method,
        url,
        headers: parts.headers,
        body,
    };

    match state.worker.dispatch(WorkerEvent::Fetch(fetch.clone())).await? {
        EventOutcome::Fetch(FetchResponse::Respond { response, source }) => {
            debug!("{} {} answered from {}", fetch.method, redact_url(&fetch.url), source.as_str());
            Ok(snapshot_response(response))
        }
        EventOutcome::Fetch(FetchResponse::Passthrough) => {
            debug!("Passing through {} {}", fetch.method, redact_url(&fetch.url));
            let response = state.worker.manager().network().fetch(&fetch).await?;
            Ok(snapshot_response(response))
        }
        other => Err(WorkerError::Internal(format!(
            "unexpected outcome for fetch event: {:?}",
            other
        ))),
    }
}

/// Absolute-form URIs (forward proxy use) are taken as-is; origin-form
/// URIs belong to the app origin.
fn request_url(uri: &Uri, state: &AppState) -> Result<Url> {
    if uri.scheme().is_some() {
        return Ok(Url::parse(&uri.to_string())?);
    }
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    state.worker.manager().resolve(path)
}

fn snapshot_response(snapshot: ResponseSnapshot) -> Response {
    let mut response = Response::new(Body::from(snapshot.body));
    *response.status_mut() = snapshot.status;
    *response.headers_mut() = snapshot.headers;
    response
}

/// Handler for messages posted by controlled pages
pub async fn message_handler(
    State(state): State<AppState>,
    Json(message): Json<Value>,
) -> Result<Json<Value>> {
    let outcome = state.worker.dispatch(WorkerEvent::Message(message)).await?;
    let body = match outcome {
        EventOutcome::Message(MessageOutcome::SkippedWaiting) => json!({"status": "skipped_waiting"}),
        EventOutcome::Message(MessageOutcome::Cached { entries }) => {
            json!({"status": "cached", "entries": entries})
        }
        EventOutcome::Message(MessageOutcome::Ignored) => json!({"status": "ignored"}),
        other => {
            return Err(WorkerError::Internal(format!(
                "unexpected outcome for message event: {:?}",
                other
            )))
        }
    };
    Ok(Json(body))
}

/// Handler for push messages. An empty body is a push without payload.
pub async fn push_handler(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let payload = if body.is_empty() { None } else { Some(body) };
    match state.worker.dispatch(WorkerEvent::Push { payload }).await? {
        EventOutcome::NotificationShown(notification) => {
            Ok((StatusCode::CREATED, Json(notification)).into_response())
        }
        other => Err(WorkerError::Internal(format!(
            "unexpected outcome for push event: {:?}",
            other
        ))),
    }
}

pub async fn notification_click_handler(
    State(state): State<AppState>,
    Json(click): Json<NotificationClick>,
) -> Result<Json<Value>> {
    match state.worker.dispatch(WorkerEvent::NotificationClick(click)).await? {
        EventOutcome::NotificationClicked(ClickOutcome::OpenedApp(url)) => {
            Ok(Json(json!({"status": "opened", "url": url.as_str()})))
        }
        EventOutcome::NotificationClicked(ClickOutcome::Closed) => Ok(Json(json!({"status": "closed"}))),
        other => Err(WorkerError::Internal(format!(
            "unexpected outcome for notification click: {:?}",
            other
        ))),
    }
}

pub async fn sync_handler(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<Value>> {
    match state.worker.dispatch(WorkerEvent::Sync { tag: request.tag }).await? {
        EventOutcome::Synced { tag, handled } => Ok(Json(json!({"tag": tag, "handled": handled}))),
        other => Err(WorkerError::Internal(format!(
            "unexpected outcome for sync event: {:?}",
            other
        ))),
    }
}
