// Shared test fixtures: a scripted network and a ready-made worker

#![allow(dead_code)]

use async_trait::async_trait;
use pace_pro_sw::cache::{Cache, CacheStorage, MemoryCacheStorage, ResponseSnapshot};
use pace_pro_sw::config::AppConfig;
use pace_pro_sw::error::{Result, WorkerError};
use pace_pro_sw::host::LocalHost;
use pace_pro_sw::network::{FetchRequest, Network};
use pace_pro_sw::worker::ServiceWorker;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const APP_ORIGIN: &str = "http://app.test";

/// Network whose responses are scripted per URL. Unscripted URLs and every
/// URL while `offline` is set fail like an unreachable server.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, ResponseSnapshot>>,
    failing: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl StubNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: StatusCode, content_type: &'static str, body: &'static str) {
        self.routes.lock().insert(
            url.to_string(),
            ResponseSnapshot::with_content_type(status, content_type, body),
        );
    }

    pub fn ok(&self, url: &str, body: &'static str) {
        self.respond(url, StatusCode::OK, "text/plain", body);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().push(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == url).count()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResponseSnapshot> {
        let url = request.url.to_string();
        self.calls.lock().push(url.clone());

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().contains(&url) {
            return Err(WorkerError::Network(format!("connection refused: {}", url)));
        }
        self.routes
            .lock()
            .get(&url)
            .cloned()
            .ok_or_else(|| WorkerError::Network(format!("no route to {}", url)))
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.worker.app_origin = APP_ORIGIN.to_string();
    config
}

/// Script the default precache list so install succeeds.
pub fn script_precache(network: &StubNetwork) {
    network.respond(&format!("{}/", APP_ORIGIN), StatusCode::OK, "text/html", "<html>root</html>");
    network.respond(
        &format!("{}/index.html", APP_ORIGIN),
        StatusCode::OK,
        "text/html",
        "<html>shell</html>",
    );
    network.respond(
        &format!("{}/manifest.json", APP_ORIGIN),
        StatusCode::OK,
        "application/manifest+json",
        "{\"name\":\"PACE PRO\"}",
    );
}

pub struct Harness {
    pub worker: Arc<ServiceWorker>,
    pub network: Arc<StubNetwork>,
    pub storage: Arc<MemoryCacheStorage>,
    pub host: Arc<LocalHost>,
}

impl Harness {
    pub fn with_config(config: AppConfig) -> Self {
        let network = StubNetwork::new();
        let storage = Arc::new(MemoryCacheStorage::new());
        let host = Arc::new(LocalHost::default());
        let worker = ServiceWorker::from_config(&config, storage.clone(), network.clone(), host.clone())
            .expect("worker builds from test config");
        Self {
            worker: Arc::new(worker),
            network,
            storage,
            host,
        }
    }

    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// A worker that has installed (with the default precache) and activated.
    pub async fn started() -> Self {
        let harness = Self::new();
        script_precache(&harness.network);
        harness.worker.start().await.expect("worker starts");
        harness
    }

    pub fn url(&self, path: &str) -> url::Url {
        url::Url::parse(APP_ORIGIN).unwrap().join(path).unwrap()
    }

    pub async fn bucket_has(&self, bucket: &str, url: &str) -> bool {
        let cache = self.storage.open(bucket).await.unwrap();
        let key = pace_pro_sw::cache::RequestKey::get(url::Url::parse(url).unwrap());
        cache.lookup(&key).await.unwrap().is_some()
    }
}
