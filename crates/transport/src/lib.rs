//! loadbench-transport: pooled HTTP/1.1 client with SSE streaming decode.
//!
//! # Overview
//!
//! This crate implements C1 (connection pool, layered on
//! [`loadbench_resilience::ConnectionPool`]), C2 (the HTTP client itself),
//! and C3 (the SSE decoder) of the load-generation harness. It knows
//! nothing about chat messages or JSON wire shapes — `loadbench-provider`
//! builds those on top of the [`HttpRequest`]/[`HttpResponse`] types here.
//!
//! # Example
//!
//! ```no_run
//! use loadbench_transport::{HttpClient, HttpClientConfig, HttpRequest, ReceiveMode};
//! use std::time::Duration;
//! use url::Url;
//!
//! # async fn example() -> Result<(), loadbench_transport::TransportError> {
//! let client = HttpClient::new(HttpClientConfig::default());
//! let request = HttpRequest::new(
//!     http::Method::GET,
//!     Url::parse("http://localhost:8080/v1/models").unwrap(),
//!     Duration::from_secs(30),
//! );
//! let response = client.execute(&request, ReceiveMode::default()).await?;
//! assert!(response.is_success());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod conn;
pub mod error;
pub mod pool;
pub mod retry;
pub mod sse;
pub mod tls;
pub mod types;

pub use client::{HttpClient, HttpClientConfig};
pub use error::TransportError;
pub use pool::{HttpConnectionPool, HttpPoolConfig, Leased};
pub use retry::RetryPolicy;
pub use sse::{decode_stream, SseDecoder, SseEvent};
pub use types::{ConnKey, HttpRequest, HttpResponse, ReceiveMode, Scheme};

pub use loadbench_resilience::OverflowStrategy;
