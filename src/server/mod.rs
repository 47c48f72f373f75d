//! Axum-based HTTP host for the offline worker.
//!
//! The server stands between the browser and the PACE PRO app. Page traffic
//! falls through to the worker as fetch events; the worker's other events
//! (messages, push, notification clicks, sync) arrive on `/__sw/*` endpoints.
//!
//! # Components
//!
//! - `handlers`: fetch interception and the control endpoints.
//! - `middleware`: request ID tracking and request metrics.
//! - `routes`: the router that ties everything together.

mod handlers;
mod middleware;
mod routes;

pub use handlers::{HealthCheck, HealthResponse, HealthStatus};
pub use routes::{create_router, AppState, CONTROL_PREFIX};
