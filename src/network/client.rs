// reqwest-backed network access

use super::{FetchRequest, Network};
use crate::cache::ResponseSnapshot;
use crate::config::NetworkConfig;
use crate::error::{Result, WorkerError};
use crate::utils::logging::redact_url;
use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderName, CONNECTION, CONTENT_LENGTH, HOST, PROXY_AUTHORIZATION, TE, TRAILER,
    TRANSFER_ENCODING, UPGRADE,
};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Headers that describe a single hop and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    CONNECTION,
    CONTENT_LENGTH,
    HOST,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Hop-by-hop headers without a typed constant in `http`.
const HOP_BY_HOP_EXTRA: [&str; 2] = ["keep-alive", "proxy-connection"];

/// Network access through a pooled HTTP client.
///
/// Requests are single-attempt: a transport failure is reported to the
/// caller immediately so the worker can fall back to its caches.
#[derive(Clone)]
pub struct HttpNetwork {
    http_client: Client,
}

impl HttpNetwork {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            // 3xx responses go back to the page as-is
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .build()
            .map_err(|e| WorkerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created HTTP client with connection pooling and keep-alive");

        Ok(Self { http_client })
    }

    fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
        let mut forwarded = headers.clone();
        strip_hop_by_hop(&mut forwarded);
        forwarded
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_EXTRA {
        headers.remove(name);
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<ResponseSnapshot> {
        let started = Instant::now();
        let target = redact_url(&request.url);

        let result = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .headers(Self::forwarded_headers(&request.headers))
            .body(request.body.clone())
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Network request {} {} failed: {}", request.method, target, e);
                crate::metrics::record_network_call("error", started.elapsed().as_secs_f64());
                return Err(WorkerError::Network(format!("{} {}: {}", request.method, target, e)));
            }
        };

        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        let body = response.bytes().await.map_err(|e| {
            crate::metrics::record_network_call("error", started.elapsed().as_secs_f64());
            WorkerError::Network(format!("reading body of {}: {}", target, e))
        })?;

        crate::metrics::record_network_call("ok", started.elapsed().as_secs_f64());
        debug!(
            "Network {} {} -> {} ({} bytes)",
            request.method,
            target,
            status.as_u16(),
            body.len()
        );

        Ok(ResponseSnapshot::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, ACCEPT};

    #[test]
    fn test_forwarded_headers_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("localhost:8787"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/html"));

        let forwarded = HttpNetwork::forwarded_headers(&headers);
        assert!(forwarded.get(HOST).is_none());
        assert!(forwarded.get(CONNECTION).is_none());
        assert_eq!(forwarded.get(ACCEPT).unwrap(), "text/html");
    }

    #[test]
    fn test_connection_listed_headers_are_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("close, X-Session-Hint"));
        headers.insert("x-session-hint", HeaderValue::from_static("abc"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("proxy-connection", HeaderValue::from_static("keep-alive"));
        headers.insert(TE, HeaderValue::from_static("trailers"));
        headers.insert(PROXY_AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        headers.insert(ACCEPT, HeaderValue::from_static("text/css"));

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(ACCEPT).unwrap(), "text/css");
    }
}
