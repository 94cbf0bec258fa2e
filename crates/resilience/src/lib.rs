//! loadbench-resilience: pure-logic fault tolerance primitives
//!
//! # Overview
//!
//! This crate provides the building blocks the rest of `loadbench` uses to
//! avoid overwhelming whatever chat-completion endpoint it is driving:
//!
//! - **Connection Pool**: efficient connection reuse with health checking
//!   and configurable overflow behavior.
//! - **Rate Limiter**: token-bucket rate limiting (via `governor`) to cap
//!   outbound request rate.
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of HTTP, JSON, or any
//! concrete connection type — it is generic over `T` and composable across
//! any layer that needs pooling or throttling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          loadbench-transport             │
//! └─────────────┬───────────────┬───────────┘
//!               │               │
//!               ▼               ▼
//! ┌───────────────────┐  ┌─────────────────────┐
//! │   Rate Limiter     │  │  Connection Pool     │
//! │ (token bucket)      │  │ (reuse, overflow)    │
//! └─────────────┬───────┘  └─────────┬───────────┘
//!               │                    │
//!               ▼                    ▼
//!           Outbound HTTP request to the provider
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use loadbench_resilience::{ConnectionPool, PoolConfig, ConnectionFactory, ResilienceError};
//! use std::sync::Arc;
//!
//! # #[derive(Clone)]
//! # struct MyConnection;
//! struct MyConnectionFactory;
//!
//! #[async_trait::async_trait]
//! impl ConnectionFactory<MyConnection> for MyConnectionFactory {
//!     async fn create(&self) -> Result<MyConnection, ResilienceError> {
//! #       Ok(MyConnection)
//!     }
//!
//!     async fn is_healthy(&self, _conn: &MyConnection) -> bool {
//!         true
//!     }
//! }
//!
//! # async fn example() -> Result<(), ResilienceError> {
//! let factory = Arc::new(MyConnectionFactory);
//! let pool = ConnectionPool::new_default(factory);
//!
//! let conn = pool.acquire().await?;
//! pool.release(conn).await;
//! # Ok(())
//! # }
//! ```

pub mod connection_pool;
pub mod error;
pub mod rate_limiter;

pub use connection_pool::{
    ConnectionFactory, ConnectionPool, OverflowStrategy, PoolConfig, PoolStats,
};
pub use error::ResilienceError;
pub use rate_limiter::{DualRateLimiter, RateLimiter};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use loadbench_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::connection_pool::{ConnectionFactory, ConnectionPool, OverflowStrategy, PoolConfig};
    pub use super::error::ResilienceError;
    pub use super::rate_limiter::{DualRateLimiter, RateLimiter};
}
