//! Bounded-concurrency batch executor (C5): schedules a batch's requests
//! across a pluggable [`RequestRunner`], honoring per-request and
//! batch-level deadlines and critical-fail short-circuit semantics.
//!
//! ```no_run
//! use loadbench_executor::{BatchExecutor, BatchItem, BatchRequest, RequestRunner};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl RequestRunner<String, String, String> for Echo {
//!     async fn run(&self, request: &String) -> Result<String, String> {
//!         Ok(request.clone())
//!     }
//! }
//!
//! # async fn run() {
//! let executor = BatchExecutor::new(Arc::new(Echo));
//! let batch = BatchRequest::new("b1", vec![BatchItem::new("r1", "hello".to_string())]);
//! let outcome = executor.execute(batch).await;
//! assert!(outcome.completed);
//! # }
//! ```

mod executor;
mod runner;
mod types;

pub use executor::BatchExecutor;
pub use runner::RequestRunner;
pub use types::{
    BatchItem, BatchItemResult, BatchOutcome, BatchRequest, ExecutorError, OutstandingEntry,
    OutstandingTable,
};
