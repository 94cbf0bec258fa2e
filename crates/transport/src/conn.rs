//! Pooled connection type and the factory that opens new ones.
//!
//! [`HttpConnection`] is the `T` that `loadbench_resilience::ConnectionPool<T>`
//! stores. Opening one means a TCP connect, optionally a TLS handshake, and
//! an HTTP/1.1 handshake that hands back a `SendRequest` plus a background
//! task driving the connection's I/O.

use bytes::Bytes;
use http_body_util::Full;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use loadbench_resilience::{ConnectionFactory, ResilienceError};

use crate::types::{ConnKey, Scheme};

pin_project! {
    /// A plain TCP or TLS-wrapped stream, unified behind one `AsyncRead`/
    /// `AsyncWrite` impl so the hyper handshake doesn't need to care which
    /// one it got.
    #[project = MaybeTlsProj]
    pub enum MaybeTlsStream {
        Plain { #[pin] inner: TcpStream },
        Tls { #[pin] inner: TlsStream<TcpStream> },
    }
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.project() {
            MaybeTlsProj::Plain { inner } => inner.poll_read(cx, buf),
            MaybeTlsProj::Tls { inner } => inner.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.project() {
            MaybeTlsProj::Plain { inner } => inner.poll_write(cx, buf),
            MaybeTlsProj::Tls { inner } => inner.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            MaybeTlsProj::Plain { inner } => inner.poll_flush(cx),
            MaybeTlsProj::Tls { inner } => inner.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            MaybeTlsProj::Plain { inner } => inner.poll_shutdown(cx),
            MaybeTlsProj::Tls { inner } => inner.poll_shutdown(cx),
        }
    }
}

/// A leased HTTP/1.1 connection: a sender half plus metadata. The
/// connection-driving task is spawned when the connection is created and
/// runs for as long as the channel stays open; `closed` flips once that
/// task observes the peer going away, which is how `is_healthy` detects an
/// out-of-band close (§4.1's "closed channel detected out-of-band").
pub struct HttpConnection {
    pub id: u64,
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
    pub created_at: Instant,
    pub use_count: u64,
    sender: SendRequest<Full<Bytes>>,
    closed: Arc<AtomicBool>,
}

impl HttpConnection {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub async fn send_request(
        &mut self,
        req: http::Request<Full<Bytes>>,
    ) -> Result<hyper::Response<hyper::body::Incoming>, hyper::Error> {
        self.use_count += 1;
        self.sender.send_request(req).await
    }
}

/// Opens new [`HttpConnection`]s for one `(host, port, scheme)` bucket.
pub struct HttpConnectionFactory {
    key: ConnKey,
    tls_config: Arc<rustls::ClientConfig>,
    next_id: std::sync::atomic::AtomicU64,
}

impl HttpConnectionFactory {
    pub fn new(key: ConnKey, tls_config: Arc<rustls::ClientConfig>) -> Self {
        Self {
            key,
            tls_config,
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    async fn open_stream(&self) -> Result<MaybeTlsStream, ResilienceError> {
        let tcp = TcpStream::connect((self.key.host.as_str(), self.key.port))
            .await
            .map_err(|e| {
                ResilienceError::Factory(format!(
                    "connect to {}:{} failed: {e}",
                    self.key.host, self.key.port
                ))
            })?;
        tcp.set_nodelay(true).ok();

        match self.key.scheme {
            Scheme::Plain => Ok(MaybeTlsStream::Plain { inner: tcp }),
            Scheme::Tls => {
                let connector = TlsConnector::from(self.tls_config.clone());
                let server_name = rustls::pki_types::ServerName::try_from(self.key.host.clone())
                    .map_err(|e| ResilienceError::Factory(format!("invalid DNS name: {e}")))?;
                let tls = connector.connect(server_name, tcp).await.map_err(|e| {
                    ResilienceError::Factory(format!("TLS handshake failed: {e}"))
                })?;
                Ok(MaybeTlsStream::Tls { inner: tls })
            }
        }
    }
}

#[async_trait::async_trait]
impl ConnectionFactory<HttpConnection> for HttpConnectionFactory {
    async fn create(&self) -> Result<HttpConnection, ResilienceError> {
        let stream = self.open_stream().await?;
        let io = TokioIo::new(stream);

        let (sender, conn) = http1::handshake(io)
            .await
            .map_err(|e| ResilienceError::Factory(format!("HTTP handshake failed: {e}")))?;

        let closed = Arc::new(AtomicBool::new(false));
        let closed_for_task = closed.clone();
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                tracing::debug!(error = %err, "pooled connection driver exited with error");
            }
            closed_for_task.store(true, Ordering::Release);
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(HttpConnection {
            id,
            host: self.key.host.clone(),
            port: self.key.port,
            scheme: self.key.scheme,
            created_at: Instant::now(),
            use_count: 0,
            sender,
            closed,
        })
    }

    async fn is_healthy(&self, conn: &HttpConnection) -> bool {
        !conn.is_closed()
    }
}
