//! `(host, port, scheme)`-keyed registry of connection pools.
//!
//! `loadbench_resilience::ConnectionPool<T>` already implements
//! acquire/release/invalidate/idle-expiry for a single bucket of connections.
//! This module adds the part the spec's §4.1 needs on top: a process-wide
//! `maxConnections` ceiling shared across every host, alongside each host's
//! own `maxConnectionsPerHost` bucket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};

use loadbench_resilience::{ConnectionPool, OverflowStrategy, PoolConfig, ResilienceError};

use crate::conn::{HttpConnection, HttpConnectionFactory};
use crate::tls::shared_client_config;
use crate::types::ConnKey;

/// Configuration for the whole registry. `overflow_strategy` and
/// `wait_timeout` govern both the global ceiling and each per-host bucket;
/// keeping them identical at both layers is a deliberate simplification
/// (see DESIGN.md).
#[derive(Debug, Clone)]
pub struct HttpPoolConfig {
    pub max_connections: usize,
    pub max_connections_per_host: usize,
    pub max_idle_time: Option<Duration>,
    pub wait_timeout: Duration,
    pub overflow_strategy: OverflowStrategy,
    pub enable_reuse: bool,
}

impl Default for HttpPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_connections_per_host: 10,
            max_idle_time: Some(Duration::from_secs(90)),
            wait_timeout: Duration::from_secs(30),
            overflow_strategy: OverflowStrategy::QueueWait,
            enable_reuse: true,
        }
    }
}

/// A connection leased from the registry. Callers must explicitly
/// [`Self::release`] or [`Self::invalidate`] it; if the guard is dropped
/// without either (e.g. its holding future was cancelled by a batch or
/// per-request deadline), it invalidates itself on drop so the pool's slot
/// count never leaks.
pub struct Leased {
    conn: Option<HttpConnection>,
    key: ConnKey,
    pool: HttpConnectionPool,
}

impl std::ops::Deref for Leased {
    type Target = HttpConnection;
    fn deref(&self) -> &HttpConnection {
        self.conn.as_ref().expect("connection taken")
    }
}

impl std::ops::DerefMut for Leased {
    fn deref_mut(&mut self) -> &mut HttpConnection {
        self.conn.as_mut().expect("connection taken")
    }
}

impl Leased {
    pub async fn release(mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(&self.key, conn).await;
        }
    }

    pub async fn invalidate(mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.invalidate(&self.key, conn).await;
        }
    }
}

impl Drop for Leased {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let pool = self.pool.clone();
            let key = self.key.clone();
            tokio::spawn(async move {
                pool.invalidate(&key, conn).await;
            });
        }
    }
}

struct Bucket {
    pool: ConnectionPool<HttpConnection>,
}

#[derive(Clone)]
pub struct HttpConnectionPool {
    inner: Arc<Inner>,
}

struct Inner {
    config: HttpPoolConfig,
    global: Arc<Semaphore>,
    buckets: RwLock<HashMap<ConnKey, Bucket>>,
}

impl HttpConnectionPool {
    pub fn new(config: HttpPoolConfig) -> Self {
        let global = Arc::new(Semaphore::new(config.max_connections));
        Self {
            inner: Arc::new(Inner {
                config,
                global,
                buckets: RwLock::new(HashMap::new()),
            }),
        }
    }

    async fn bucket_pool(&self, key: &ConnKey) -> ConnectionPool<HttpConnection> {
        {
            let buckets = self.inner.buckets.read().await;
            if let Some(bucket) = buckets.get(key) {
                return bucket.pool.clone();
            }
        }
        let mut buckets = self.inner.buckets.write().await;
        if let Some(bucket) = buckets.get(key) {
            return bucket.pool.clone();
        }
        let factory = Arc::new(HttpConnectionFactory::new(key.clone(), shared_client_config()));
        let pool = ConnectionPool::new(
            factory,
            PoolConfig {
                max_size: self.inner.config.max_connections_per_host,
                idle_timeout: self.inner.config.max_idle_time,
                acquire_timeout: self.inner.config.wait_timeout,
                overflow_strategy: self.inner.config.overflow_strategy,
                enable_reuse: self.inner.config.enable_reuse,
            },
        );
        buckets.insert(key.clone(), Bucket { pool: pool.clone() });
        pool
    }

    /// Acquire a leased connection for `key`.
    pub async fn acquire(&self, key: ConnKey) -> Result<Leased, ResilienceError> {
        self.acquire_global_slot().await?;

        let bucket = self.bucket_pool(&key).await;
        match bucket.acquire().await {
            Ok(conn) => Ok(Leased {
                conn: Some(conn),
                key,
                pool: self.clone(),
            }),
            Err(e) => {
                self.inner.global.add_permits(1);
                Err(e)
            }
        }
    }

    async fn acquire_global_slot(&self) -> Result<(), ResilienceError> {
        match self.inner.config.overflow_strategy {
            OverflowStrategy::QueueWait => {
                let permit = tokio::time::timeout(
                    self.inner.config.wait_timeout,
                    self.inner.global.acquire(),
                )
                .await
                .map_err(|_| ResilienceError::Timeout(self.inner.config.wait_timeout))?
                .map_err(|_| ResilienceError::Closed)?;
                permit.forget();
                Ok(())
            }
            OverflowStrategy::DirectReject => self
                .inner
                .global
                .try_acquire()
                .map(|p| p.forget())
                .map_err(|_| ResilienceError::PoolFull),
            OverflowStrategy::FailFast => self
                .inner
                .global
                .try_acquire()
                .map(|p| p.forget())
                .map_err(|_| ResilienceError::PoolAtCapacity),
        }
    }

    async fn release(&self, key: &ConnKey, conn: HttpConnection) {
        if let Some(bucket) = self.inner.buckets.read().await.get(key) {
            bucket.pool.release(conn).await;
        }
        self.inner.global.add_permits(1);
    }

    async fn invalidate(&self, key: &ConnKey, conn: HttpConnection) {
        if let Some(bucket) = self.inner.buckets.read().await.get(key) {
            bucket.pool.invalidate(conn).await;
        }
        self.inner.global.add_permits(1);
    }

    /// Total connections currently open across every host, for tests and
    /// diagnostics.
    pub async fn total_connections(&self) -> usize {
        let mut total = 0;
        for bucket in self.inner.buckets.read().await.values() {
            total += bucket.pool.stats().await.total;
        }
        total
    }

    /// Periodically evict idle connections from every bucket. Intended to
    /// be driven from a background `tokio::spawn`ed loop.
    pub async fn sweep_idle_once(&self) {
        for bucket in self.inner.buckets.read().await.values() {
            bucket.pool.sweep_idle().await;
        }
    }

    /// Spawn the background idle-sweep task; returns a handle the caller
    /// can abort on shutdown.
    pub fn spawn_idle_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let pool = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                pool.sweep_idle_once().await;
            }
        })
    }

    /// Drain every bucket and reject further acquisitions.
    pub async fn shutdown(&self) {
        self.inner.global.close();
        for bucket in self.inner.buckets.read().await.values() {
            bucket.pool.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// A bare TCP listener that accepts and holds connections open. The
    /// client-side `http1::handshake` only needs the socket, not a real
    /// HTTP exchange, so this is enough for pool-capacity tests.
    async fn spawn_accept_loop() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        tokio::spawn(async move {
                            let mut socket = socket;
                            let mut buf = [0u8; 1024];
                            loop {
                                use tokio::io::AsyncReadExt;
                                match socket.read(&mut buf).await {
                                    Ok(0) | Err(_) => break,
                                    Ok(_) => continue,
                                }
                            }
                        });
                    }
                    Err(_) => break,
                }
            }
        });
        addr
    }

    fn key_for(addr: std::net::SocketAddr) -> ConnKey {
        ConnKey {
            host: addr.ip().to_string(),
            port: addr.port(),
            scheme: crate::types::Scheme::Plain,
        }
    }

    #[tokio::test]
    async fn test_acquire_release_reuses_connection() {
        let addr = spawn_accept_loop().await;
        let key = key_for(addr);
        let pool = HttpConnectionPool::new(HttpPoolConfig::default());

        let leased = pool.acquire(key.clone()).await.unwrap();
        let id = leased.id;
        leased.release().await;

        let leased2 = pool.acquire(key.clone()).await.unwrap();
        assert_eq!(leased2.id, id, "idle connection should be reused");
        leased2.release().await;
    }

    #[tokio::test]
    async fn test_global_cap_is_enforced_across_hosts() {
        let addr_a = spawn_accept_loop().await;
        let addr_b = spawn_accept_loop().await;

        let config = HttpPoolConfig {
            max_connections: 1,
            max_connections_per_host: 10,
            overflow_strategy: OverflowStrategy::DirectReject,
            ..HttpPoolConfig::default()
        };
        let pool = HttpConnectionPool::new(config);

        let _leased_a = pool.acquire(key_for(addr_a)).await.unwrap();
        let err = pool.acquire(key_for(addr_b)).await.unwrap_err();
        assert!(matches!(err, ResilienceError::PoolFull));
    }

    #[tokio::test]
    async fn test_dropping_a_leased_connection_invalidates_it() {
        let addr = spawn_accept_loop().await;
        let key = key_for(addr);
        let pool = HttpConnectionPool::new(HttpPoolConfig::default());

        {
            let _leased = pool.acquire(key.clone()).await.unwrap();
            // dropped without release/invalidate: background task must
            // invalidate it so the slot isn't leaked.
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.total_connections().await, 0);
    }
}
