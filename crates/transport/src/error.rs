//! Error kinds raised by the transport layer.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`crate::client::HttpClient`] and [`crate::pool::HttpConnectionPool`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP connect or TLS handshake failed.
    #[error("connect failed to {host}:{port}: {message}")]
    Connect {
        host: String,
        port: u16,
        message: String,
    },

    /// Writing the request (headers or body) to the wire failed.
    #[error("write failed: {0}")]
    Write(String),

    /// The channel closed before a complete response was received.
    #[error("connection closed prematurely")]
    PrematureClose,

    /// The response was not well-formed HTTP, or its body could not be
    /// decoded as the expected wire shape.
    #[error("malformed response: {0}")]
    Protocol(String),

    /// The server replied with a status code >= 400.
    #[error("HTTP {status}: {body}")]
    BadStatus { status: u16, body: String },

    /// Per-request timeout elapsed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The in-flight request was cancelled (batch deadline, critical-fail
    /// short-circuit, or executor shutdown).
    #[error("request cancelled")]
    Cancelled,

    /// Connection pool failure (full, at capacity, closed, or timed out
    /// waiting for a slot). Wraps [`loadbench_resilience::ResilienceError`].
    #[error("connection pool error: {0}")]
    Pool(#[from] loadbench_resilience::ResilienceError),

    /// The request URL could not be parsed into (host, port, scheme).
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Whether C2-level retry (§7) should be attempted for this error:
    /// connect failure, 5xx, or read timeout. 4xx other than 429 and
    /// cancellation are never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Connect { .. } => true,
            TransportError::Timeout(_) => true,
            TransportError::BadStatus { status, .. } => *status == 429 || *status >= 500,
            TransportError::PrematureClose => true,
            TransportError::Write(_)
            | TransportError::Protocol(_)
            | TransportError::Cancelled
            | TransportError::Pool(_)
            | TransportError::InvalidUrl(_) => false,
        }
    }
}
