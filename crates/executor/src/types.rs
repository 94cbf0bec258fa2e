//! Batch request/outcome types (§3) and the outstanding-request table.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// One logical request inside a batch.
#[derive(Debug, Clone)]
pub struct BatchItem<Req> {
    pub request_id: String,
    pub request: Req,
    /// A failed critical item aborts the rest of the batch (§4.5).
    pub critical: bool,
}

impl<Req> BatchItem<Req> {
    pub fn new(request_id: impl Into<String>, request: Req) -> Self {
        Self {
            request_id: request_id.into(),
            request,
            critical: false,
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// An immutable batch submission. Request ids must be unique within a
/// batch.
#[derive(Debug, Clone)]
pub struct BatchRequest<Req> {
    pub batch_id: String,
    pub items: Vec<BatchItem<Req>>,
    /// `None` means no batch-level deadline.
    pub batch_deadline: Option<Duration>,
    pub per_request_deadline: Duration,
    pub max_concurrent: usize,
}

impl<Req> BatchRequest<Req> {
    pub fn new(batch_id: impl Into<String>, items: Vec<BatchItem<Req>>) -> Self {
        Self {
            batch_id: batch_id.into(),
            items,
            batch_deadline: None,
            per_request_deadline: Duration::from_secs(60),
            max_concurrent: 1,
        }
    }
}

/// Why a request inside a batch did not succeed. Wraps whatever error type
/// the [`crate::runner::RequestRunner`] produces alongside the two failure
/// modes the executor itself introduces (timeout, cancellation).
#[derive(Debug, Clone)]
pub enum ExecutorError<Err> {
    /// The per-request deadline elapsed before the runner finished.
    Timeout,
    /// The batch deadline fired, or the executor was shut down, before
    /// this request was dispatched or completed.
    Cancelled,
    /// The request was never dispatched because a critical failure
    /// short-circuited the batch.
    CriticalFailureUpstream,
    /// The runner itself returned an error.
    Runner(Err),
}

impl<Err: std::fmt::Display> std::fmt::Display for ExecutorError<Err> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorError::Timeout => write!(f, "request timed out"),
            ExecutorError::Cancelled => write!(f, "request cancelled"),
            ExecutorError::CriticalFailureUpstream => {
                write!(f, "batch aborted before this request was dispatched")
            }
            ExecutorError::Runner(e) => write!(f, "{e}"),
        }
    }
}

impl<Err: std::fmt::Debug + std::fmt::Display> std::error::Error for ExecutorError<Err> {}

/// One request's result, carrying its id so ordering can be reconstructed
/// independent of completion order.
#[derive(Debug, Clone)]
pub struct BatchItemResult<Resp, Err> {
    pub request_id: String,
    pub elapsed: Duration,
    pub outcome: Result<Resp, ExecutorError<Err>>,
}

impl<Resp, Err> BatchItemResult<Resp, Err> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// The finalised result of a batch (§3): one result per input request,
/// in input order, plus batch-level status.
#[derive(Debug, Clone)]
pub struct BatchOutcome<Resp, Err> {
    pub batch_id: String,
    pub results: Vec<BatchItemResult<Resp, Err>>,
    /// All results were obtained before the batch deadline and without a
    /// critical-fail short-circuit.
    pub completed: bool,
    pub cancelled: bool,
    pub termination_reason: Option<String>,
}

impl<Resp, Err> BatchOutcome<Resp, Err> {
    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.successful_count()
    }
}

/// Correlation id -> (batch id, start time), live only while a batch is in
/// flight (§3). Used for diagnostics; entries are removed on completion or
/// timeout by the dispatcher itself.
#[derive(Default)]
pub struct OutstandingTable {
    entries: Mutex<HashMap<String, OutstandingEntry>>,
}

#[derive(Debug, Clone)]
pub struct OutstandingEntry {
    pub batch_id: String,
    pub started_at: Instant,
}

impl OutstandingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, request_id: String, batch_id: String) {
        self.entries.lock().await.insert(
            request_id,
            OutstandingEntry {
                batch_id,
                started_at: Instant::now(),
            },
        );
    }

    pub async fn remove(&self, request_id: &str) {
        self.entries.lock().await.remove(request_id);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
