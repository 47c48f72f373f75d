// Network access for the worker

mod client;

pub use client::HttpNetwork;

use crate::cache::{RequestKey, ResponseSnapshot};
use crate::error::{Result, WorkerError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use url::Url;

/// Outbound request capability of the host.
///
/// Every response the server produced is `Ok`, whatever its status. Only
/// transport failures (offline, DNS, refused connection, timeout) are errors.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResponseSnapshot>;
}

/// A request issued by a controlled page.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A bodiless `GET`.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse `url` and build a `GET` for it.
    pub fn get_str(url: &str) -> Result<Self> {
        Ok(Self::get(Url::parse(url)?))
    }

    pub fn with_header(mut self, name: reqwest::header::HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| WorkerError::InvalidRequest(format!("invalid value for header {}: {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.clone(), self.url.clone())
    }

    /// True when the `Accept` header asks for an HTML document. A missing
    /// header is not an HTML request.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"))
    }
}
