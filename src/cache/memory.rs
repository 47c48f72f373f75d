// In-memory cache storage

use super::{ensure_storable, Cache, CacheStorage, RequestKey, ResponseSnapshot};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Process-local bucket storage. Buckets are listed in creation order.
#[derive(Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<Vec<Arc<MemoryCache>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        if let Some(existing) = self.buckets.read().iter().find(|b| b.name == name) {
            return Ok(existing.clone());
        }

        let mut buckets = self.buckets.write();
        // Another opener may have won the race between the two locks
        if let Some(existing) = buckets.iter().find(|b| b.name == name) {
            return Ok(existing.clone());
        }
        debug!("Creating cache bucket {}", name);
        let bucket = Arc::new(MemoryCache::new(name));
        buckets.push(bucket.clone());
        Ok(bucket)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.buckets.read().iter().any(|b| b.name == name))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut buckets = self.buckets.write();
        let before = buckets.len();
        buckets.retain(|b| b.name != name);
        Ok(buckets.len() != before)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.buckets.read().iter().map(|b| b.name.clone()).collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// A single in-memory bucket.
pub struct MemoryCache {
    name: String,
    entries: RwLock<HashMap<RequestKey, ResponseSnapshot>>,
}

impl MemoryCache {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>> {
        if !key.is_cacheable() {
            return Ok(None);
        }
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: RequestKey, response: ResponseSnapshot) -> Result<()> {
        ensure_storable(&key, &response)?;
        self.entries.write().insert(key, response);
        Ok(())
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}
