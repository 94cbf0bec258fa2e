//! Wire-level HTTP types: the request fingerprint and response record of §3.
//!
//! These are deliberately distinct from `loadbench_provider::ChatRequest` /
//! `ChatResponse` — this module knows nothing about chat messages, only
//! URLs, headers, and bytes. See `loadbench_provider::adapter` for the
//! provider-agnostic logical request that gets encoded into one of these.

use bytes::Bytes;
use http::{HeaderMap, Method};
use std::time::Duration;
use url::Url;

use crate::error::TransportError;

/// Scheme of a connection key, derived from a request URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Plain,
    Tls,
}

/// `(host, port, scheme)` — the key the connection pool buckets on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnKey {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
}

impl ConnKey {
    /// Derive the pool key from a request URL. Only `http`/`https` schemes
    /// are supported; anything else is a [`TransportError::InvalidUrl`].
    pub fn from_url(url: &Url) -> Result<Self, TransportError> {
        let scheme = match url.scheme() {
            "http" => Scheme::Plain,
            "https" => Scheme::Tls,
            other => {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme: {other}"
                )))
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidUrl("missing host".to_string()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TransportError::InvalidUrl("missing port".to_string()))?;
        Ok(Self { host, port, scheme })
    }
}

/// Immutable request fingerprint, constructed once by a provider adapter and
/// never mutated afterward.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url, timeout: Duration) -> Self {
        Self {
            url,
            method,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            timeout,
        }
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: &str) -> Self {
        if let Ok(value) = http::HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }
}

/// How `HttpClient::execute` should receive the response body.
#[derive(Debug, Clone, Copy)]
pub enum ReceiveMode {
    /// Aggregate the full body, rejecting responses larger than
    /// `max_body_bytes`.
    Buffered { max_body_bytes: usize },
}

impl Default for ReceiveMode {
    fn default() -> Self {
        // 1 MiB ceiling per §4.2.
        ReceiveMode::Buffered {
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Immutable response record. For buffered responses, `body` is the
/// complete payload; streaming responses are handled by
/// [`crate::client::HttpClient::execute_streaming`] instead, which forwards
/// decoded chunks directly rather than materializing a `HttpResponse`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub elapsed: Duration,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
