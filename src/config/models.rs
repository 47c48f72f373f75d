//! Configuration data structures for the PACE PRO offline worker.
//!
//! This module defines the schema for the application settings: the proxy
//! server, the worker's caching policy, the cache storage backend, the
//! upstream network client, push notification content and logging.

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, workers).
    #[serde(default)]
    pub server: ServerConfig,

    /// Caching policy settings (origin, version, precache list).
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Cache storage backend settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Upstream network client settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Push notification content.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Local host integration settings.
    #[serde(default)]
    pub host: HostConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8787`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads for the tokio runtime.
    /// Default: Number of logical CPU cores.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Largest request body accepted from controlled pages, in bytes.
    /// Default: `10485760` (10 MiB)
    #[serde(default = "default_body_limit")]
    pub max_body_bytes: usize,
}

/// Settings for the caching policy itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Origin of the hosted application. Same-origin requests are
    /// network-first against this origin.
    /// Default: `http://127.0.0.1:3000`
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// Release version carried in the precache bucket name.
    /// Default: `1.0.0`
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by both bucket names.
    /// Default: `pace-pro`
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Paths fetched into the precache at install time.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Cross-origin hosts eligible for runtime caching.
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// Cached document served to offline HTML navigations with no cache entry.
    /// Default: `/index.html`
    #[serde(default = "default_offline_shell")]
    pub offline_shell: String,

    /// Fail the whole upgrade when the precache cannot be populated.
    /// Default: `false`
    #[serde(default)]
    pub strict_install: bool,
}

/// Which storage backend holds the cache buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Memory,
    Disk,
}

/// Settings for the cache storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend used for cache buckets (`memory` or `disk`).
    /// Default: `disk`
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackendKind,

    /// Root directory of the disk backend.
    /// Default: `~/.pace-pro/caches`
    #[serde(default = "default_cache_directory")]
    pub directory: String,
}

/// Settings for the upstream HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds.
    /// Default: `30`
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Maximum number of idle connections kept per upstream host.
    /// Default: `16`
    #[serde(default = "default_pool_size")]
    pub pool_max_idle_per_host: usize,
}

/// A button shown on a push notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationActionConfig {
    pub action: String,
    pub title: String,
}

/// Content of notifications built from push messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,

    /// Body used when the push message carries no payload.
    #[serde(default = "default_notification_body")]
    pub default_body: String,

    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default = "default_badge")]
    pub badge: String,

    /// Vibration pattern in milliseconds.
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,

    #[serde(default = "default_notification_tag")]
    pub tag: String,

    #[serde(default)]
    pub require_interaction: bool,

    #[serde(default = "default_actions")]
    pub actions: Vec<NotificationActionConfig>,
}

/// Settings for the local host integration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HostConfig {
    /// Open the system browser when the worker asks for a client window.
    /// Default: `false`
    #[serde(default)]
    pub launch_browser: bool,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Whether to strip query strings from URLs written to logs.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub redact_queries: bool,
}

impl WorkerConfig {
    /// Name of the versioned precache bucket, e.g. `pace-pro-v1.0.0`.
    pub fn precache_name(&self) -> String {
        format!("{}-v{}", self.cache_prefix, self.version)
    }

    /// Name of the unversioned runtime bucket, e.g. `pace-pro-runtime`.
    pub fn runtime_name(&self) -> String {
        format!("{}-runtime", self.cache_prefix)
    }
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            max_body_bytes: default_body_limit(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            app_origin: default_app_origin(),
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            precache_urls: default_precache_urls(),
            allowed_hosts: default_allowed_hosts(),
            offline_shell: default_offline_shell(),
            strict_install: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            directory: default_cache_directory(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            pool_max_idle_per_host: default_pool_size(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            default_body: default_notification_body(),
            icon: default_icon(),
            badge: default_badge(),
            vibrate: default_vibrate(),
            tag: default_notification_tag(),
            require_interaction: false,
            actions: default_actions(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            redact_queries: true,
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

fn default_app_origin() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_cache_prefix() -> String {
    "pace-pro".to_string()
}

fn default_precache_urls() -> Vec<String> {
    vec![
        "/".to_string(),
        "/index.html".to_string(),
        "/manifest.json".to_string(),
    ]
}

fn default_allowed_hosts() -> Vec<String> {
    vec![
        "cdnjs.cloudflare.com".to_string(),
        "fonts.googleapis.com".to_string(),
        "fonts.gstatic.com".to_string(),
    ]
}

fn default_offline_shell() -> String {
    "/index.html".to_string()
}

fn default_cache_backend() -> CacheBackendKind {
    CacheBackendKind::Disk
}

fn default_cache_directory() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".pace-pro")
        .join("caches")
        .to_string_lossy()
        .to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_pool_size() -> usize {
    16
}

fn default_notification_title() -> String {
    "PACE PRO".to_string()
}

fn default_notification_body() -> String {
    "Hora de treinar! 🏃‍♂️".to_string()
}

fn default_icon() -> String {
    "/icon-192.png".to_string()
}

fn default_badge() -> String {
    "/badge-72.png".to_string()
}

fn default_vibrate() -> Vec<u32> {
    vec![200, 100, 200]
}

fn default_notification_tag() -> String {
    "pace-pro-notification".to_string()
}

fn default_actions() -> Vec<NotificationActionConfig> {
    vec![
        NotificationActionConfig {
            action: "start".to_string(),
            title: "Iniciar Treino".to_string(),
        },
        NotificationActionConfig {
            action: "dismiss".to_string(),
            title: "Depois".to_string(),
        },
    ]
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
