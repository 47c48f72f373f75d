// Prometheus metrics registry and collectors

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_gauge_with_registry,
    register_histogram_vec_with_registry, CounterVec, Encoder, Gauge, HistogramVec, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // REQUEST METRICS
    // ============================================================================

    /// Total number of HTTP requests handled by the proxy host
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("requests_total", "Total number of HTTP requests"),
        &["method", "route", "status_code"],
        REGISTRY
    ).unwrap();

    /// Request duration histogram
    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("request_duration_seconds", "Request duration in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "route"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // FETCH STRATEGY METRICS
    // ============================================================================

    /// Fetch events by strategy and where the response came from
    pub static ref FETCH_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("fetch_events_total", "Fetch events by strategy and response source"),
        &["strategy", "source"], // source: network, cache, offline_shell, offline_page, none
        REGISTRY
    ).unwrap();

    /// Upstream network calls
    pub static ref NETWORK_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("network_calls_total", "Total upstream network calls"),
        &["outcome"], // outcome: ok, error
        REGISTRY
    ).unwrap();

    /// Upstream network call duration
    pub static ref NETWORK_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("network_duration_seconds", "Upstream network call duration")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["outcome"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations per bucket
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["bucket", "operation"], // operation: hit, miss, put, put_error, delete_bucket
        REGISTRY
    ).unwrap();

    /// Buckets present after the last activation
    pub static ref CACHE_BUCKETS: Gauge = register_gauge_with_registry!(
        Opts::new("cache_buckets_current", "Number of cache buckets after activation"),
        REGISTRY
    ).unwrap();

    // ============================================================================
    // LIFECYCLE METRICS
    // ============================================================================

    /// Install / activate / sync outcomes
    pub static ref LIFECYCLE_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("lifecycle_events_total", "Worker lifecycle events"),
        &["event", "status"], // status: success, failure, ignored
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CLIENT INTERACTION METRICS
    // ============================================================================

    /// Notifications shown and clicked
    pub static ref NOTIFICATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("notifications_total", "Notification events"),
        &["event"], // event: shown, clicked, window_opened
        REGISTRY
    ).unwrap();

    /// Messages received from controlled pages
    pub static ref CLIENT_MESSAGES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("client_messages_total", "Messages received from controlled pages"),
        &["type"],
        REGISTRY
    ).unwrap();
}

/// Register every collector up front so unlabelled gauges are exported
/// before their first update.
pub fn init() {
    lazy_static::initialize(&REQUESTS_TOTAL);
    lazy_static::initialize(&REQUEST_DURATION);
    lazy_static::initialize(&FETCH_EVENTS);
    lazy_static::initialize(&NETWORK_CALLS);
    lazy_static::initialize(&NETWORK_DURATION);
    lazy_static::initialize(&CACHE_OPERATIONS);
    lazy_static::initialize(&CACHE_BUCKETS);
    lazy_static::initialize(&LIFECYCLE_EVENTS);
    lazy_static::initialize(&NOTIFICATIONS);
    lazy_static::initialize(&CLIENT_MESSAGES);
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        init();
        // Vec collectors only show up once a label set has been touched
        FETCH_EVENTS.with_label_values(&["network_first", "network"]).inc();
        CACHE_OPERATIONS.with_label_values(&["pace-pro-runtime", "hit"]).inc();
        LIFECYCLE_EVENTS.with_label_values(&["install", "success"]).inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("fetch_events_total"));
        assert!(metrics.contains("cache_operations_total"));
        assert!(metrics.contains("lifecycle_events_total"));
        assert!(metrics.contains("cache_buckets_current"));
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        assert!(gather_metrics().contains("cache_buckets_current"));
    }
}
