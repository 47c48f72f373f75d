//! Caching policy.
//!
//! The `CacheManager` decides which bucket a request belongs to, whether the
//! network or the cache answers it, and which buckets survive a version
//! upgrade. It owns no I/O of its own: storage, network and lifecycle signals
//! all go through the host traits handed to it at construction.

use crate::cache::{Cache, CacheNames, CacheStorage, RequestKey, ResponseSnapshot};
use crate::config::WorkerConfig;
use crate::error::{Result, WorkerError};
use crate::host::Host;
use crate::metrics;
use crate::network::{FetchRequest, Network};
use crate::utils::logging::redact_url;
use futures::future::try_join_all;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use url::Url;

/// Served to offline HTML navigations when not even the offline shell is cached.
pub const OFFLINE_PAGE: &str = "<!DOCTYPE html>\n\
<html lang=\"pt-BR\">\n\
<head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><title>PACE PRO - offline</title></head>\n\
<body><main><h1>PACE PRO</h1><p>Sem conexão. Reconecte-se para continuar.</p></main></body>\n\
</html>\n";

/// Immutable inputs of the caching policy.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub names: CacheNames,
    pub app_origin: Url,
    pub precache_urls: Vec<String>,
    pub allowed_hosts: Vec<String>,
    pub offline_shell: String,
    pub strict_install: bool,
}

impl WorkerSettings {
    pub fn from_config(config: &WorkerConfig) -> Result<Self> {
        let app_origin = Url::parse(&config.app_origin).map_err(|e| {
            WorkerError::Config(format!("invalid app origin '{}': {}", config.app_origin, e))
        })?;

        Ok(Self {
            names: CacheNames::new(config.precache_name(), config.runtime_name()),
            app_origin,
            precache_urls: config.precache_urls.clone(),
            allowed_hosts: config
                .allowed_hosts
                .iter()
                .map(|h| h.trim().trim_end_matches('.').to_ascii_lowercase())
                .collect(),
            offline_shell: config.offline_shell.clone(),
            strict_install: config.strict_install,
        })
    }
}

/// Result of populating the precache at install time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Every precache URL was stored.
    Precached { entries: usize },
    /// Population failed and the error was swallowed; nothing was stored.
    Incomplete { reason: String },
}

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// The cached offline shell stood in for an uncached HTML navigation.
    OfflineShell,
    /// The built-in offline page; the shell itself was not cached.
    OfflinePage,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::OfflineShell => "offline_shell",
            ResponseSource::OfflinePage => "offline_page",
        }
    }
}

/// Decision for one intercepted request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResponse {
    Respond {
        response: ResponseSnapshot,
        source: ResponseSource,
    },
    /// The worker does not intervene; the host performs the request as-is.
    Passthrough,
}

/// True when `host` is `allowed` or one of its subdomains.
pub fn host_matches(host: &str, allowed: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if allowed.is_empty() {
        return false;
    }
    host == allowed
        || host
            .strip_suffix(allowed)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

pub struct CacheManager {
    settings: WorkerSettings,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    host: Arc<dyn Host>,
    background: TaskTracker,
}

impl CacheManager {
    pub fn new(
        settings: WorkerSettings,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            settings,
            storage,
            network,
            host,
            background: TaskTracker::new(),
        }
    }

    pub fn names(&self) -> &CacheNames {
        &self.settings.names
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Resolve a path or URL against the app origin.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        Ok(self.settings.app_origin.join(url)?)
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.settings.app_origin.origin()
    }

    pub fn is_allowed_host(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| {
            self.settings
                .allowed_hosts
                .iter()
                .any(|allowed| host_matches(host, allowed))
        })
    }

    /// Populate the precache and ask the host to activate this version.
    ///
    /// Failure is all-or-nothing: if any precache URL cannot be fetched,
    /// nothing is stored. Unless `strict_install` is set the failure is
    /// logged and reported as [`InstallOutcome::Incomplete`], and the host is
    /// not asked to skip waiting.
    pub async fn install(&self) -> Result<InstallOutcome> {
        let precache = self.names().precache();
        info!("Installing worker, precache bucket {}", precache);

        let result = async {
            let cache = self.storage.open(precache).await?;
            debug!("Cache {} opened, adding {} resources", precache, self.settings.precache_urls.len());
            let entries = self.populate(&cache, &self.settings.precache_urls).await?;
            self.host.skip_waiting().await?;
            Ok::<_, WorkerError>(entries)
        }
        .await;

        match result {
            Ok(entries) => {
                info!("Precached {} resources into {}", entries, precache);
                metrics::record_lifecycle("install", "success");
                Ok(InstallOutcome::Precached { entries })
            }
            Err(e) => {
                error!("Precache of {} failed: {}", precache, e);
                metrics::record_lifecycle("install", "failure");
                if self.settings.strict_install {
                    Err(WorkerError::Install(e.to_string()))
                } else {
                    Ok(InstallOutcome::Incomplete {
                        reason: e.to_string(),
                    })
                }
            }
        }
    }

    /// Delete every bucket other than the current precache and runtime
    /// cache, then take control of open clients. Returns the deleted names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        info!("Activating worker {}", self.names().precache());

        let result = async {
            let stale: Vec<String> = self
                .storage
                .keys()
                .await?
                .into_iter()
                .filter(|name| !self.names().is_current(name))
                .collect();

            try_join_all(stale.iter().map(|name| async move {
                info!("Removing stale cache {}", name);
                self.storage.delete(name).await?;
                metrics::record_bucket_deleted(name);
                Ok::<_, WorkerError>(())
            }))
            .await?;

            self.host.claim_clients().await?;
            metrics::update_bucket_count(self.storage.keys().await?.len());
            Ok::<_, WorkerError>(stale)
        }
        .await;

        match &result {
            Ok(deleted) => {
                info!("Worker activated, {} stale caches removed", deleted.len());
                metrics::record_lifecycle("activate", "success");
            }
            Err(e) => {
                error!("Activation failed: {}", e);
                metrics::record_lifecycle("activate", "failure");
            }
        }
        result
    }

    /// Route one intercepted request.
    ///
    /// - cross-origin, allowed host: cache first, filling the runtime cache;
    /// - cross-origin, any other host: [`FetchResponse::Passthrough`];
    /// - same-origin: network first, falling back to the caches and then to
    ///   the offline shell for HTML navigations.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        if !self.is_same_origin(&request.url) {
            if self.is_allowed_host(&request.url) {
                return self.cache_first(request).await;
            }
            metrics::record_fetch("passthrough", "host");
            return Ok(FetchResponse::Passthrough);
        }
        self.network_first(request).await
    }

    /// Fetch and store `urls` into the runtime cache, all-or-nothing.
    pub async fn cache_urls(&self, urls: &[String]) -> Result<usize> {
        let runtime = self.names().runtime();
        let cache = self.storage.open(runtime).await?;
        let entries = self.populate(&cache, urls).await?;
        info!("Cached {} client-requested URLs into {}", entries, runtime);
        Ok(entries)
    }

    /// Wait until every background cache write started so far has settled.
    pub async fn wait_for_background_tasks(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    async fn cache_first(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let key = request.key();
        if let Some(cached) = self.match_any(&key).await? {
            metrics::record_fetch("cache_first", "cache");
            return Ok(FetchResponse::Respond {
                response: cached,
                source: ResponseSource::Cache,
            });
        }

        let response = match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_fetch("cache_first", "none");
                return Err(e);
            }
        };

        if key.is_cacheable() {
            self.store_in_background(self.names().runtime(), key, response.clone());
        }
        metrics::record_fetch("cache_first", "network");
        Ok(FetchResponse::Respond {
            response,
            source: ResponseSource::Network,
        })
    }

    async fn network_first(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let key = request.key();
        let error = match self.network.fetch(request).await {
            Ok(response) => {
                if response.status == StatusCode::OK && key.is_cacheable() {
                    self.store_in_background(self.names().precache(), key, response.clone());
                }
                metrics::record_fetch("network_first", "network");
                return Ok(FetchResponse::Respond {
                    response,
                    source: ResponseSource::Network,
                });
            }
            Err(e) if e.is_network() => e,
            Err(e) => return Err(e),
        };

        let target = redact_url(&request.url);
        debug!("Network unavailable for {}: {}", target, error);

        if let Some(cached) = self.match_any(&key).await? {
            info!("Serving {} from cache", target);
            metrics::record_fetch("network_first", "cache");
            return Ok(FetchResponse::Respond {
                response: cached,
                source: ResponseSource::Cache,
            });
        }

        if request.accepts_html() {
            let shell_key = RequestKey::get(self.resolve(&self.settings.offline_shell)?);
            if let Some(shell) = self.match_any(&shell_key).await? {
                info!("Serving offline shell for {}", target);
                metrics::record_fetch("network_first", "offline_shell");
                return Ok(FetchResponse::Respond {
                    response: shell,
                    source: ResponseSource::OfflineShell,
                });
            }
            warn!("Offline shell {} is not cached, serving built-in offline page", self.settings.offline_shell);
            metrics::record_fetch("network_first", "offline_page");
            return Ok(FetchResponse::Respond {
                response: offline_page(),
                source: ResponseSource::OfflinePage,
            });
        }

        metrics::record_fetch("network_first", "none");
        Err(WorkerError::NoResponse(target))
    }

    /// Look the key up in the precache, then in the runtime cache. Buckets
    /// that do not exist yet are not created.
    async fn match_any(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>> {
        for bucket in [self.names().precache(), self.names().runtime()] {
            if !self.storage.has(bucket).await? {
                continue;
            }
            let cache = self.storage.open(bucket).await?;
            if let Some(hit) = cache.lookup(key).await? {
                metrics::record_cache_hit(bucket);
                return Ok(Some(hit));
            }
            metrics::record_cache_miss(bucket);
        }
        Ok(None)
    }

    /// Fetch every URL, then store them all. Nothing is stored unless every
    /// fetch succeeded with a 2xx status.
    async fn populate(&self, cache: &Arc<dyn Cache>, urls: &[String]) -> Result<usize> {
        let resolved = urls
            .iter()
            .map(|u| self.resolve(u))
            .collect::<Result<Vec<_>>>()?;

        let fetched = try_join_all(resolved.into_iter().map(|url| async move {
            let response = self.network.fetch(&FetchRequest::get(url.clone())).await?;
            if !response.is_success() {
                return Err(WorkerError::Network(format!(
                    "{} responded with status {}",
                    redact_url(&url),
                    response.status.as_u16()
                )));
            }
            Ok::<_, WorkerError>((RequestKey::get(url), response))
        }))
        .await?;

        let entries = fetched.len();
        for (key, response) in fetched {
            cache.put(key, response).await?;
            metrics::record_cache_put(cache.name(), true);
        }
        Ok(entries)
    }

    /// Write a response copy without holding up the caller. The write is
    /// tracked so shutdown and tests can wait for it; failures are logged.
    fn store_in_background(&self, bucket: &str, key: RequestKey, response: ResponseSnapshot) {
        let storage = self.storage.clone();
        let bucket = bucket.to_string();
        let target = redact_url(key.url());

        self.background.spawn(async move {
            let result = async {
                let cache = storage.open(&bucket).await?;
                cache.put(key, response).await
            }
            .await;

            match result {
                Ok(()) => {
                    debug!("Stored {} in {}", target, bucket);
                    metrics::record_cache_put(&bucket, true);
                }
                Err(e) => {
                    warn!("Failed to store {} in {}: {}", target, bucket, e);
                    metrics::record_cache_put(&bucket, false);
                }
            }
        });
    }
}

fn offline_page() -> ResponseSnapshot {
    ResponseSnapshot::with_content_type(
        StatusCode::SERVICE_UNAVAILABLE,
        "text/html; charset=utf-8",
        OFFLINE_PAGE,
    )
}
