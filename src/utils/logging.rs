//! Structured logging and log-safe URL rendering.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats, and provides a helper that keeps
//! query strings (which may carry session tokens from the hosted page) out of
//! log output.

use crate::config::LoggingConfig;
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

static REDACT_QUERIES: AtomicBool = AtomicBool::new(true);

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    REDACT_QUERIES.store(config.redact_queries, Ordering::Relaxed);

    // Configure filter from environment or config file
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

/// Renders a URL for logging.
///
/// Unless redaction was switched off in `LoggingConfig`, the query string is
/// replaced with `?[REDACTED]` and the fragment and any userinfo are dropped.
pub fn redact_url(url: &Url) -> String {
    if !REDACT_QUERIES.load(Ordering::Relaxed) {
        return url.to_string();
    }
    redact(url)
}

fn redact(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_fragment(None);
    let _ = clean.set_username("");
    let _ = clean.set_password(None);
    let had_query = clean.query().is_some_and(|q| !q.is_empty());
    clean.set_query(None);

    let mut rendered = clean.to_string();
    if had_query {
        rendered.push_str("?[REDACTED]");
    }
    rendered
}
