//! Error type shared by the pool and rate limiter primitives.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by [`crate::connection_pool::ConnectionPool`] and
/// [`crate::rate_limiter::RateLimiter`].
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// `OverflowStrategy::DirectReject`: the pool was full and the caller
    /// declined to wait.
    #[error("connection pool is full")]
    PoolFull,

    /// `OverflowStrategy::FailFast`: the pool was already at its configured
    /// capacity when the request arrived.
    #[error("connection pool at capacity")]
    PoolAtCapacity,

    /// `OverflowStrategy::QueueWait` waited longer than `acquire_timeout`.
    #[error("timed out after {0:?} waiting for a resource")]
    Timeout(Duration),

    /// The pool has been shut down; no further acquisitions are possible.
    #[error("connection pool is closed")]
    Closed,

    /// A [`crate::connection_pool::ConnectionFactory`] failed to create a
    /// connection.
    #[error("connection factory error: {0}")]
    Factory(String),

    /// The rate limiter's configured quota could not be satisfied before its
    /// deadline elapsed.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// A configuration value was invalid (e.g. zero `max_requests`).
    #[error("invalid resilience configuration: {0}")]
    Permanent(String),
}
