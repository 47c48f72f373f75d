// HTTP routes configuration

use super::handlers::{
    health_handler, intercept_handler, message_handler, metrics_handler,
    notification_click_handler, push_handler, sync_handler,
};
use super::middleware::{request_id_layers, track_requests};
use crate::config::AppConfig;
use crate::error::Result;
use crate::worker::ServiceWorker;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Path prefix of the worker's own endpoints. Everything else is page traffic.
pub const CONTROL_PREFIX: &str = "/__sw";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub worker: Arc<ServiceWorker>,
}

pub fn create_router(config: AppConfig, worker: Arc<ServiceWorker>) -> Result<Router> {
    crate::metrics::init();
    let body_limit = config.server.max_body_bytes;
    let state = AppState {
        config: Arc::new(config),
        worker,
    };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route(&format!("{CONTROL_PREFIX}/health"), get(health_handler))
        .route(&format!("{CONTROL_PREFIX}/metrics"), get(metrics_handler))
        .route(&format!("{CONTROL_PREFIX}/message"), post(message_handler))
        .route(&format!("{CONTROL_PREFIX}/push"), post(push_handler))
        .route(
            &format!("{CONTROL_PREFIX}/notificationclick"),
            post(notification_click_handler),
        )
        .route(&format!("{CONTROL_PREFIX}/sync"), post(sync_handler))
        .fallback(intercept_handler)
        .layer(tower_http::limit::RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    Ok(app)
}
