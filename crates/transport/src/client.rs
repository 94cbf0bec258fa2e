//! HTTP client — C2. Leases a connection from the pool, writes one request,
//! and either buffers the full response or hands its body to the SSE
//! decoder.

use bytes::{Bytes, BytesMut};
use http::header::{CACHE_CONTROL, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::HeaderValue;
use http_body_util::{BodyExt, Full};
use std::time::{Duration, Instant};

use crate::error::TransportError;
use crate::pool::{HttpConnectionPool, HttpPoolConfig};
use crate::retry::RetryPolicy;
use crate::sse;
use crate::types::{ConnKey, HttpRequest, HttpResponse, ReceiveMode, Scheme};

pub struct HttpClientConfig {
    pub pool: HttpPoolConfig,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            pool: HttpPoolConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Clone)]
pub struct HttpClient {
    pool: HttpConnectionPool,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Self {
        Self {
            pool: HttpConnectionPool::new(config.pool),
            retry: config.retry,
        }
    }

    pub fn pool(&self) -> &HttpConnectionPool {
        &self.pool
    }

    /// Execute one request, with C2-level retry applied to transient
    /// failures.
    pub async fn execute(
        &self,
        request: &HttpRequest,
        mode: ReceiveMode,
    ) -> Result<HttpResponse, TransportError> {
        self.retry
            .run(|| self.execute_once(request, mode))
            .await
    }

    async fn execute_once(
        &self,
        request: &HttpRequest,
        mode: ReceiveMode,
    ) -> Result<HttpResponse, TransportError> {
        let key = ConnKey::from_url(&request.url)?;
        let mut leased = self.pool.acquire(key).await?;

        let wire = build_wire_request(request, false)?;
        let started = Instant::now();

        let send = tokio::time::timeout(request.timeout, leased.send_request(wire)).await;
        let response = match send {
            Err(_) => {
                leased.invalidate().await;
                return Err(TransportError::Timeout(request.timeout));
            }
            Ok(Err(e)) => {
                leased.invalidate().await;
                return Err(TransportError::Write(e.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        let headers = response.headers().clone();

        let ReceiveMode::Buffered { max_body_bytes } = mode;
        let remaining = request.timeout.saturating_sub(started.elapsed());
        let body_result =
            tokio::time::timeout(remaining, read_body_capped(response, max_body_bytes)).await;

        let body = match body_result {
            Err(_) => {
                leased.invalidate().await;
                return Err(TransportError::Timeout(request.timeout));
            }
            Ok(Err(e)) => {
                leased.invalidate().await;
                return Err(e);
            }
            Ok(Ok(body)) => body,
        };

        let elapsed = started.elapsed();

        if status.as_u16() >= 400 {
            leased.invalidate().await;
            return Err(TransportError::BadStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).to_string(),
            });
        }

        leased.release().await;
        Ok(HttpResponse {
            status: status.as_u16(),
            status_text,
            headers,
            body,
            elapsed,
        })
    }

    /// Send a request with SSE headers and forward every decoded `data:`
    /// chunk to `chunk_sink` as it arrives. Resolves once the stream
    /// terminates (`[DONE]`, end of body, or the sink going away).
    pub async fn execute_streaming(
        &self,
        request: &HttpRequest,
        chunk_sink: tokio::sync::mpsc::Sender<String>,
    ) -> Result<(), TransportError> {
        let key = ConnKey::from_url(&request.url)?;
        let mut leased = self.pool.acquire(key).await?;

        let wire = build_wire_request(request, true)?;
        let send = tokio::time::timeout(request.timeout, leased.send_request(wire)).await;
        let response = match send {
            Err(_) => {
                leased.invalidate().await;
                return Err(TransportError::Timeout(request.timeout));
            }
            Ok(Err(e)) => {
                leased.invalidate().await;
                return Err(TransportError::Write(e.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        if response.status().as_u16() >= 400 {
            let status = response.status().as_u16();
            let body = read_body_capped(response, 64 * 1024)
                .await
                .unwrap_or_default();
            leased.invalidate().await;
            return Err(TransportError::BadStatus {
                status,
                body: String::from_utf8_lossy(&body).to_string(),
            });
        }

        let body = response.into_body();
        let frame_stream = http_body_util::BodyStream::new(body);
        let byte_stream = futures::StreamExt::map(frame_stream, |frame| {
            frame
                .map_err(|e| TransportError::Protocol(e.to_string()))
                .and_then(|frame| {
                    frame
                        .into_data()
                        .map_err(|_| TransportError::Protocol("non-data frame in body".into()))
                })
        });

        let result = sse::decode_stream(byte_stream, chunk_sink).await;
        match &result {
            Ok(()) => leased.release().await,
            Err(_) => leased.invalidate().await,
        }
        result
    }
}

async fn read_body_capped(
    response: hyper::Response<hyper::body::Incoming>,
    max_body_bytes: usize,
) -> Result<Bytes, TransportError> {
    let mut body = response.into_body();
    let mut collected = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| TransportError::Protocol(e.to_string()))?;
        if let Ok(data) = frame.into_data() {
            if collected.len() + data.len() > max_body_bytes {
                return Err(TransportError::Protocol(format!(
                    "response body exceeded {max_body_bytes} byte ceiling"
                )));
            }
            collected.extend_from_slice(&data);
        }
    }
    Ok(collected.freeze())
}

fn build_wire_request(
    request: &HttpRequest,
    streaming: bool,
) -> Result<http::Request<Full<Bytes>>, TransportError> {
    let mut path_and_query = request.url.path().to_string();
    if path_and_query.is_empty() {
        path_and_query.push('/');
    }
    if let Some(query) = request.url.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    let mut builder = http::Request::builder()
        .method(request.method.clone())
        .uri(path_and_query);

    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }

    let headers = builder
        .headers_mut()
        .ok_or_else(|| TransportError::Protocol("malformed request builder".to_string()))?;

    if !headers.contains_key(HOST) {
        let host_value = match ConnKey::from_url(&request.url)?.scheme {
            Scheme::Plain if request.url.port() == Some(80) || request.url.port().is_none() => {
                request.url.host_str().unwrap_or_default().to_string()
            }
            Scheme::Tls if request.url.port() == Some(443) || request.url.port().is_none() => {
                request.url.host_str().unwrap_or_default().to_string()
            }
            _ => format!(
                "{}:{}",
                request.url.host_str().unwrap_or_default(),
                request.url.port_or_known_default().unwrap_or(80)
            ),
        };
        headers.insert(HOST, HeaderValue::from_str(&host_value).map_err(|e| {
            TransportError::Protocol(format!("invalid host header: {e}"))
        })?);
    }

    if !request.body.is_empty() {
        if !headers.contains_key(CONTENT_LENGTH) {
            headers.insert(
                CONTENT_LENGTH,
                HeaderValue::from_str(&request.body.len().to_string()).unwrap(),
            );
        }
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
        }
    }

    if streaming {
        headers.insert(
            http::header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    } else if !headers.contains_key(CONNECTION) {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
    }

    builder
        .body(Full::new(request.body.clone()))
        .map_err(|e| TransportError::Protocol(format!("failed to build request: {e}")))
}
