//! Named response caches.
//!
//! A [`CacheStorage`] owns any number of named buckets; each bucket is a
//! [`Cache`] mapping a [`RequestKey`] to a [`ResponseSnapshot`]. Two backends
//! are provided:
//!
//! - [`MemoryCacheStorage`]: process-local, lost on restart.
//! - [`DiskCacheStorage`]: one directory per bucket, survives restarts so that
//!   buckets left behind by an older release can be purged on activation.

mod disk;
mod memory;
pub mod models;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;
pub use models::{CacheNames, RequestKey, ResponseSnapshot};

use crate::config::{CacheBackendKind, CacheConfig};
use crate::error::{Result, WorkerError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;

/// A set of named buckets.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a bucket, creating it when absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>>;

    async fn has(&self, name: &str) -> Result<bool>;

    /// Delete a bucket and every entry in it. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Names of all existing buckets.
    async fn keys(&self) -> Result<Vec<String>>;

    fn backend(&self) -> &'static str;
}

/// One bucket.
#[async_trait]
pub trait Cache: Send + Sync {
    fn name(&self) -> &str;

    /// Look up a stored response. Non-GET keys never match.
    async fn lookup(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>>;

    /// Store a response, replacing any previous entry for the same key.
    async fn put(&self, key: RequestKey, response: ResponseSnapshot) -> Result<()>;

    async fn delete(&self, key: &RequestKey) -> Result<bool>;

    async fn keys(&self) -> Result<Vec<RequestKey>>;
}

/// Build the storage backend selected in configuration.
pub fn storage_from_config(config: &CacheConfig) -> Result<Arc<dyn CacheStorage>> {
    match config.backend {
        CacheBackendKind::Memory => Ok(Arc::new(MemoryCacheStorage::new())),
        CacheBackendKind::Disk => Ok(Arc::new(DiskCacheStorage::new(&config.directory)?)),
    }
}

/// Reject entries a bucket cannot hold: non-GET requests and partial content.
pub(crate) fn ensure_storable(key: &RequestKey, response: &ResponseSnapshot) -> Result<()> {
    if !key.is_cacheable() {
        return Err(WorkerError::Cache(format!(
            "request method '{}' is unsupported for {}",
            key.method(),
            key.url()
        )));
    }
    if response.status == StatusCode::PARTIAL_CONTENT {
        return Err(WorkerError::Cache(format!(
            "partial response (206) cannot be stored for {}",
            key.url()
        )));
    }
    Ok(())
}
