//! Generic connection pool for reusable connections.
//!
//! Keyed storage (e.g. per `(host, port, scheme)`) is layered on top of this
//! by callers — `loadbench-transport`'s `HttpConnectionPool` holds one of
//! these per endpoint plus a process-wide counter. This crate only knows
//! about a single bucket of connections of type `T`.

use super::error::ResilienceError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};

/// What `acquire` does once the pool is at capacity and no idle connection
/// is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowStrategy {
    /// Park the caller until a connection frees up, the pool is resized, or
    /// `acquire_timeout` elapses.
    QueueWait,
    /// Fail immediately with [`ResilienceError::PoolFull`].
    DirectReject,
    /// Fail immediately with [`ResilienceError::PoolAtCapacity`].
    FailFast,
}

/// Configuration for connection pool behavior.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections the bucket will hold.
    pub max_size: usize,
    /// Maximum time a connection can remain idle before being evicted.
    pub idle_timeout: Option<Duration>,
    /// How long `acquire` waits under `OverflowStrategy::QueueWait`.
    pub acquire_timeout: Duration,
    /// Overflow policy once the bucket is at `max_size`.
    pub overflow_strategy: OverflowStrategy,
    /// Whether idle connections may be handed back out (`false` forces a
    /// fresh connection on every acquire, still subject to `max_size`).
    pub enable_reuse: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            idle_timeout: Some(Duration::from_secs(300)),
            acquire_timeout: Duration::from_secs(30),
            overflow_strategy: OverflowStrategy::QueueWait,
            enable_reuse: true,
        }
    }
}

/// A connection wrapper that tracks idle metadata.
struct PooledConnection<T> {
    conn: T,
    last_used: Instant,
}

impl<T> PooledConnection<T> {
    fn new(conn: T) -> Self {
        Self {
            conn,
            last_used: Instant::now(),
        }
    }

    fn is_expired(&self, config: &PoolConfig) -> bool {
        match config.idle_timeout {
            Some(idle_timeout) => self.last_used.elapsed() > idle_timeout,
            None => false,
        }
    }
}

/// Factory trait for creating and validating connections.
#[async_trait::async_trait]
pub trait ConnectionFactory<T: Send + 'static>: Send + Sync {
    /// Create a new connection.
    async fn create(&self) -> Result<T, ResilienceError>;

    /// Check if a connection is still healthy.
    async fn is_healthy(&self, conn: &T) -> bool;

    /// Close a connection (optional cleanup). Default drops it.
    async fn close(&self, conn: T) {
        drop(conn);
    }
}

/// Internal pool state.
struct PoolState<T> {
    idle: Vec<PooledConnection<T>>,
    active_count: usize,
}

impl<T> PoolState<T> {
    fn new() -> Self {
        Self {
            idle: Vec::new(),
            active_count: 0,
        }
    }

    fn total_count(&self) -> usize {
        self.idle.len() + self.active_count
    }
}

/// A generic, bucket-scoped connection pool.
///
/// Invariant: at every instant `total <= max_size`; a connection is either
/// idle in `state.idle` or checked out (counted in `active_count`) — never
/// both.
///
/// # Example
/// ```no_run
/// use loadbench_resilience::{ConnectionPool, PoolConfig, ConnectionFactory, ResilienceError};
/// use std::sync::Arc;
///
/// # #[derive(Clone)]
/// # struct MyConnection { id: usize }
/// struct MyConnectionFactory;
///
/// #[async_trait::async_trait]
/// impl ConnectionFactory<MyConnection> for MyConnectionFactory {
///     async fn create(&self) -> Result<MyConnection, ResilienceError> {
///         Ok(MyConnection { id: 1 })
///     }
///
///     async fn is_healthy(&self, _conn: &MyConnection) -> bool {
///         true
///     }
/// }
///
/// # async fn example() -> Result<(), ResilienceError> {
/// let factory = Arc::new(MyConnectionFactory);
/// let pool = ConnectionPool::new(factory, PoolConfig::default());
///
/// let conn = pool.acquire().await?;
/// pool.release(conn).await;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionPool<T> {
    config: Arc<PoolConfig>,
    factory: Arc<dyn ConnectionFactory<T>>,
    state: Arc<Mutex<PoolState<T>>>,
    semaphore: Arc<Semaphore>,
    closed: Arc<AtomicBool>,
}

impl<T: Send + 'static> Clone for ConnectionPool<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            factory: self.factory.clone(),
            state: self.state.clone(),
            semaphore: self.semaphore.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<T: Send + 'static> ConnectionPool<T> {
    /// Create a new connection pool.
    pub fn new(factory: Arc<dyn ConnectionFactory<T>>, config: PoolConfig) -> Self {
        let max_size = config.max_size;
        Self {
            config: Arc::new(config),
            factory,
            state: Arc::new(Mutex::new(PoolState::new())),
            semaphore: Arc::new(Semaphore::new(max_size)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a connection pool with default configuration.
    pub fn new_default(factory: Arc<dyn ConnectionFactory<T>>) -> Self {
        Self::new(factory, PoolConfig::default())
    }

    /// Acquire a connection from the pool.
    ///
    /// If an idle, healthy connection is available it is reused. Otherwise
    /// a new one is created, subject to `max_size`. Once the bucket is at
    /// capacity, behavior is governed by `overflow_strategy`.
    pub async fn acquire(&self) -> Result<T, ResilienceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ResilienceError::Closed);
        }

        let permit = match self.config.overflow_strategy {
            OverflowStrategy::QueueWait => {
                tokio::time::timeout(self.config.acquire_timeout, self.semaphore.acquire())
                    .await
                    .map_err(|_| ResilienceError::Timeout(self.config.acquire_timeout))?
                    .map_err(|_| ResilienceError::Closed)?
            }
            OverflowStrategy::DirectReject => self
                .semaphore
                .try_acquire()
                .map_err(|_| ResilienceError::PoolFull)?,
            OverflowStrategy::FailFast => self
                .semaphore
                .try_acquire()
                .map_err(|_| ResilienceError::PoolAtCapacity)?,
        };
        // Permits are returned explicitly in `release`/`invalidate`, not
        // when this guard drops.
        permit.forget();

        let mut state = self.state.lock().await;
        state.idle.retain(|conn| !conn.is_expired(&self.config));

        if self.config.enable_reuse {
            while let Some(pooled) = state.idle.pop() {
                if self.factory.is_healthy(&pooled.conn).await {
                    state.active_count += 1;
                    drop(state);
                    return Ok(pooled.conn);
                }
                self.factory.close(pooled.conn).await;
                state = self.state.lock().await;
            }
        }

        state.active_count += 1;
        drop(state);

        match self.factory.create().await {
            Ok(conn) => Ok(conn),
            Err(e) => {
                self.semaphore.add_permits(1);
                let mut state = self.state.lock().await;
                state.active_count -= 1;
                Err(e)
            }
        }
    }

    /// Return a connection to the pool.
    ///
    /// The connection is health-checked before being kept idle; an
    /// unhealthy one is closed instead. Use [`Self::invalidate`] when the
    /// caller already knows the connection is broken (e.g. after a
    /// transport error) to skip the health check.
    pub async fn release(&self, conn: T) {
        let healthy = self.factory.is_healthy(&conn).await;
        let mut state = self.state.lock().await;
        state.active_count -= 1;

        if healthy && !self.closed.load(Ordering::Acquire) {
            state.idle.push(PooledConnection::new(conn));
            drop(state);
        } else {
            drop(state);
            self.factory.close(conn).await;
        }
        self.semaphore.add_permits(1);
    }

    /// Mark a checked-out connection INVALID: close it and free its slot
    /// without attempting to return it to the idle bucket.
    pub async fn invalidate(&self, conn: T) {
        let mut state = self.state.lock().await;
        state.active_count -= 1;
        drop(state);
        self.factory.close(conn).await;
        self.semaphore.add_permits(1);
    }

    /// Evict every idle connection whose `idle_timeout` has elapsed.
    /// Intended to be driven periodically from a `tokio::time::interval`
    /// loop owned by the caller.
    pub async fn sweep_idle(&self) {
        let mut state = self.state.lock().await;
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.idle)
            .into_iter()
            .partition(|c| c.is_expired(&self.config));
        state.idle = kept;
        drop(state);

        for pooled in expired {
            self.factory.close(pooled.conn).await;
        }
    }

    /// Close all idle connections without shutting down the pool.
    pub async fn clear_idle(&self) {
        let mut state = self.state.lock().await;
        let idle = std::mem::take(&mut state.idle);
        drop(state);

        for pooled in idle {
            self.factory.close(pooled.conn).await;
        }
    }

    /// Permanently close the pool: reject further acquisitions, wake any
    /// `QueueWait` waiters with [`ResilienceError::Closed`], and close
    /// every idle connection. Checked-out connections are closed as they
    /// are returned (`release`/`invalidate` both short-circuit to `close`
    /// once `closed` is set).
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.semaphore.close();

        let mut state = self.state.lock().await;
        let idle = std::mem::take(&mut state.idle);
        drop(state);
        for pooled in idle {
            self.factory.close(pooled.conn).await;
        }
    }

    /// Get current pool statistics.
    pub async fn stats(&self) -> PoolStats {
        let state = self.state.lock().await;
        PoolStats {
            idle: state.idle.len(),
            active: state.active_count,
            total: state.total_count(),
            max_size: self.config.max_size,
        }
    }
}

/// Pool statistics.
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Number of idle connections.
    pub idle: usize,
    /// Number of active (checked-out) connections.
    pub active: usize,
    /// Total connections (idle + active).
    pub total: usize,
    /// Maximum pool size.
    pub max_size: usize,
}

impl PoolStats {
    /// Get pool utilization as a percentage.
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            (self.total as f64 / self.max_size as f64) * 100.0
        }
    }
}
