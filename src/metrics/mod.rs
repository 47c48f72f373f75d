// Metrics module for Prometheus observability

mod registry;

pub use registry::{
    gather_metrics,
    init,
    CACHE_BUCKETS,
    CACHE_OPERATIONS,
    CLIENT_MESSAGES,
    FETCH_EVENTS,
    LIFECYCLE_EVENTS,
    NETWORK_CALLS,
    NETWORK_DURATION,
    NOTIFICATIONS,
    REQUESTS_TOTAL,
    REQUEST_DURATION,
};

/// Helper to record request metrics
pub fn record_request(method: &str, route: &str, status_code: u16, duration_secs: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[method, route, &status_code.to_string()])
        .inc();

    REQUEST_DURATION
        .with_label_values(&[method, route])
        .observe(duration_secs);
}

/// Helper to record which strategy answered a fetch event and from where
pub fn record_fetch(strategy: &str, source: &str) {
    FETCH_EVENTS.with_label_values(&[strategy, source]).inc();
}

/// Helper to record an upstream network call
pub fn record_network_call(outcome: &str, duration_secs: f64) {
    NETWORK_CALLS.with_label_values(&[outcome]).inc();
    NETWORK_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Helper to record cache operations
pub fn record_cache_hit(bucket: &str) {
    CACHE_OPERATIONS.with_label_values(&[bucket, "hit"]).inc();
}

pub fn record_cache_miss(bucket: &str) {
    CACHE_OPERATIONS.with_label_values(&[bucket, "miss"]).inc();
}

pub fn record_cache_put(bucket: &str, success: bool) {
    let operation = if success { "put" } else { "put_error" };
    CACHE_OPERATIONS.with_label_values(&[bucket, operation]).inc();
}

pub fn record_bucket_deleted(bucket: &str) {
    CACHE_OPERATIONS.with_label_values(&[bucket, "delete_bucket"]).inc();
}

pub fn update_bucket_count(count: usize) {
    CACHE_BUCKETS.set(count as f64);
}

/// Helper to record lifecycle outcomes (install, activate, sync)
pub fn record_lifecycle(event: &str, status: &str) {
    LIFECYCLE_EVENTS.with_label_values(&[event, status]).inc();
}

pub fn record_notification(event: &str) {
    NOTIFICATIONS.with_label_values(&[event]).inc();
}

pub fn record_client_message(kind: &str) {
    CLIENT_MESSAGES.with_label_values(&[kind]).inc();
}
