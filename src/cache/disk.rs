//! Disk-backed cache storage.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<hex(bucket name)>/<sha256(request key)>.json
//! ```
//!
//! Each entry file holds the request key, the response status and headers,
//! and the base64-encoded body. Writes go to a temporary file first and are
//! renamed into place, so a reader never observes a half-written entry.

use super::{ensure_storable, Cache, CacheStorage, RequestKey, ResponseSnapshot};
use crate::error::{Result, WorkerError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const ENTRY_EXTENSION: &str = "json";

/// Bucket storage rooted at a directory.
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    /// Create the storage, making the root directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        debug!("Disk cache storage rooted at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, name: &str) -> PathBuf {
        self.root.join(hex::encode(name.as_bytes()))
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        let dir = self.bucket_dir(name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Arc::new(DiskCache {
            name: name.to_string(),
            dir,
        }))
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.bucket_dir(name)).await?)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        match tokio::fs::remove_dir_all(self.bucket_dir(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Bucket names, sorted. Directories that do not decode to a name are skipped.
    async fn keys(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            let decoded = hex::decode(file_name.to_string_lossy().as_bytes())
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok());
            match decoded {
                Some(name) => names.push(name),
                None => warn!("Ignoring foreign directory in cache root: {:?}", file_name),
            }
        }
        names.sort();
        Ok(names)
    }

    fn backend(&self) -> &'static str {
        "disk"
    }
}

/// On-disk form of one cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    method: String,
    url: String,
    status: u16,
    /// Header name and base64 of the raw value.
    headers: Vec<(String, String)>,
    body: String,
    stored_at: DateTime<Utc>,
}

impl StoredEntry {
    fn from_parts(key: &RequestKey, response: &ResponseSnapshot) -> Self {
        Self {
            method: key.method().to_string(),
            url: key.url().to_string(),
            status: response.status.as_u16(),
            headers: response
                .header_pairs()
                .into_iter()
                .map(|(name, value)| (name, STANDARD.encode(value)))
                .collect(),
            body: STANDARD.encode(&response.body),
            stored_at: Utc::now(),
        }
    }

    fn key(&self) -> Result<RequestKey> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|e| WorkerError::Cache(format!("corrupt entry method '{}': {}", self.method, e)))?;
        Ok(RequestKey::new(method, Url::parse(&self.url)?))
    }

    fn into_response(self) -> Result<ResponseSnapshot> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| WorkerError::Cache(format!("corrupt entry status {}: {}", self.status, e)))?;
        let body = STANDARD
            .decode(self.body.as_bytes())
            .map_err(|e| WorkerError::Cache(format!("corrupt entry body: {}", e)))?;
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| {
                STANDARD
                    .decode(value.as_bytes())
                    .map(|raw| (name.clone(), raw))
                    .map_err(|e| WorkerError::Cache(format!("corrupt entry header {}: {}", name, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ResponseSnapshot::new(
            status,
            ResponseSnapshot::headers_from_pairs(&headers),
            body,
        ))
    }
}

/// A bucket directory.
pub struct DiskCache {
    name: String,
    dir: PathBuf,
}

impl DiskCache {
    fn entry_path(&self, key: &RequestKey) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.to_string().as_bytes());
        self.dir
            .join(format!("{:x}", hasher.finalize()))
            .with_extension(ENTRY_EXTENSION)
    }

    async fn read_entry(path: &Path) -> Result<Option<StoredEntry>> {
        match tokio::fs::read(path).await {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Cache for DiskCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<ResponseSnapshot>> {
        if !key.is_cacheable() {
            return Ok(None);
        }
        match Self::read_entry(&self.entry_path(key)).await? {
            Some(entry) => entry.into_response().map(Some),
            None => Ok(None),
        }
    }

    async fn put(&self, key: RequestKey, response: ResponseSnapshot) -> Result<()> {
        ensure_storable(&key, &response)?;

        let path = self.entry_path(&key);
        let raw = serde_json::to_vec(&StoredEntry::from_parts(&key, &response))?;
        let tmp = self.dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        // Bucket may have been deleted by an activation since it was opened
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, raw).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<RequestKey>> {
        let mut keys = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(stored) = Self::read_entry(&path).await? {
                keys.push(stored.key()?);
            }
        }
        Ok(keys)
    }
}
