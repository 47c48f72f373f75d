//! Request keys, response snapshots and bucket names.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use std::fmt;
use url::Url;

/// Identity of a cached request: method plus URL. Headers are ignored and the
/// fragment never takes part in matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: Method,
    url: Url,
}

impl RequestKey {
    pub fn new(method: Method, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method, url }
    }

    /// Key for a plain `GET` of `url`.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Only `GET` requests can be stored in or matched against a bucket.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A response captured in full: status, headers and body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseSnapshot {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// A response with a single `Content-Type` header.
    pub fn with_content_type(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self::new(status, headers, body)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Headers as owned name/raw-value pairs. Values are kept as bytes, so
    /// nothing is lost for values that are not valid UTF-8.
    pub fn header_pairs(&self) -> Vec<(String, Vec<u8>)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect()
    }

    /// Rebuild a header map from name/value pairs, dropping invalid entries.
    pub fn headers_from_pairs(pairs: &[(String, Vec<u8>)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_bytes(value),
            ) {
                headers.append(name, value);
            }
        }
        headers
    }
}

/// The two bucket names the worker owns. Built once from configuration and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    precache: String,
    runtime: String,
}

impl CacheNames {
    pub fn new(precache: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            precache: precache.into(),
            runtime: runtime.into(),
        }
    }

    pub fn precache(&self) -> &str {
        &self.precache
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    /// True for buckets that survive activation.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.precache || name == self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_fragment() {
        let a = RequestKey::get(Url::parse("http://app.test/index.html#top").unwrap());
        let b = RequestKey::get(Url::parse("http://app.test/index.html").unwrap());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "GET http://app.test/index.html");
    }

    #[test]
    fn test_key_distinguishes_method() {
        let url = Url::parse("http://app.test/api").unwrap();
        let get = RequestKey::get(url.clone());
        let post = RequestKey::new(Method::POST, url);
        assert_ne!(get, post);
        assert!(get.is_cacheable());
        assert!(!post.is_cacheable());
    }

    #[test]
    fn test_header_pairs_survive_rebuild() {
        let snapshot = ResponseSnapshot::with_content_type(StatusCode::OK, "text/html", "<p>hi</p>");
        let pairs = snapshot.header_pairs();
        let rebuilt = ResponseSnapshot::headers_from_pairs(&pairs);
        assert_eq!(rebuilt.get(CONTENT_TYPE).unwrap(), "text/html");
    }

    #[test]
    fn test_header_pairs_keep_non_utf8_values() {
        let mut headers = HeaderMap::new();
        let raw = b"attachment; filename=\"treino\xe9.gpx\"";
        headers.insert("content-disposition", HeaderValue::from_bytes(raw).unwrap());
        let snapshot = ResponseSnapshot::new(StatusCode::OK, headers, "gpx");

        let rebuilt = ResponseSnapshot::headers_from_pairs(&snapshot.header_pairs());
        assert_eq!(rebuilt.get("content-disposition").unwrap().as_bytes(), &raw[..]);
    }

    #[test]
    fn test_cache_names_current() {
        let names = CacheNames::new("pace-pro-v2.0.0", "pace-pro-runtime");
        assert!(names.is_current("pace-pro-v2.0.0"));
        assert!(names.is_current("pace-pro-runtime"));
        assert!(!names.is_current("pace-pro-v1.0.0"));
    }
}
