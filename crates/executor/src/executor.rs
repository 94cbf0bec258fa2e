//! Batch executor — C5. Bounded-concurrency dispatch with per-request and
//! batch-level deadlines and critical-fail short-circuit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};

use crate::runner::RequestRunner;
use crate::types::{BatchItemResult, BatchOutcome, BatchRequest, ExecutorError, OutstandingTable};

/// Schedules a [`BatchRequest`]'s items across a `RequestRunner` with
/// bounded parallelism. One executor instance can run many batches
/// sequentially; `shutdown` makes all of them (in flight or future) fail
/// fast.
pub struct BatchExecutor<Req, Resp, Err> {
    runner: Arc<dyn RequestRunner<Req, Resp, Err>>,
    closed: Arc<AtomicBool>,
}

impl<Req, Resp, Err> Clone for BatchExecutor<Req, Resp, Err> {
    fn clone(&self) -> Self {
        Self {
            runner: self.runner.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<Req, Resp, Err> BatchExecutor<Req, Resp, Err>
where
    Req: Send + Sync + 'static,
    Resp: Send + 'static,
    Err: Send + 'static,
{
    pub fn new(runner: Arc<dyn RequestRunner<Req, Resp, Err>>) -> Self {
        Self {
            runner,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Once closed, new submissions fail immediately with a "closed"
    /// outcome; this does not affect a batch already mid-execution.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub async fn execute(&self, batch: BatchRequest<Req>) -> BatchOutcome<Resp, Err> {
        let BatchRequest {
            batch_id,
            items,
            batch_deadline,
            per_request_deadline,
            max_concurrent,
        } = batch;

        let item_order: Vec<String> = items.iter().map(|i| i.request_id.clone()).collect();

        if self.closed.load(Ordering::Acquire) {
            let results = item_order
                .into_iter()
                .map(|request_id| BatchItemResult {
                    request_id,
                    elapsed: Duration::ZERO,
                    outcome: Err(ExecutorError::Cancelled),
                })
                .collect();
            return BatchOutcome {
                batch_id,
                results,
                completed: false,
                cancelled: true,
                termination_reason: Some("executor closed".to_string()),
            };
        }

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let critical_failed = Arc::new(AtomicBool::new(false));
        let completed: Arc<Mutex<HashMap<String, BatchItemResult<Resp, Err>>>> =
            Arc::new(Mutex::new(HashMap::with_capacity(item_order.len())));
        let outstanding = Arc::new(OutstandingTable::new());

        let dispatch_fut = {
            let runner = self.runner.clone();
            let completed = completed.clone();
            let critical_failed = critical_failed.clone();
            let outstanding = outstanding.clone();
            let batch_id_for_dispatch = batch_id.clone();
            async move {
                let mut handles = Vec::with_capacity(items.len());
                for item in items {
                    if critical_failed.load(Ordering::Acquire) {
                        break;
                    }
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let runner = runner.clone();
                    let completed = completed.clone();
                    let critical_failed = critical_failed.clone();
                    let outstanding = outstanding.clone();
                    let batch_id = batch_id_for_dispatch.clone();

                    let handle = tokio::spawn(async move {
                        let _permit = permit;
                        let request_id = item.request_id.clone();
                        outstanding.insert(request_id.clone(), batch_id).await;

                        let start = Instant::now();
                        let run_result =
                            tokio::time::timeout(per_request_deadline, runner.run(&item.request))
                                .await;
                        let elapsed = start.elapsed();
                        outstanding.remove(&request_id).await;

                        let outcome = match run_result {
                            Ok(Ok(resp)) => Ok(resp),
                            Ok(Err(e)) => Err(ExecutorError::Runner(e)),
                            Err(_) => Err(ExecutorError::Timeout),
                        };

                        if outcome.is_err() && item.critical {
                            critical_failed.store(true, Ordering::Release);
                        }

                        completed.lock().await.insert(
                            request_id.clone(),
                            BatchItemResult {
                                request_id,
                                elapsed,
                                outcome,
                            },
                        );
                    });
                    handles.push(handle);
                }
                for handle in handles {
                    let _ = handle.await;
                }
            }
        };

        let timed_out = match batch_deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = dispatch_fut => false,
                    _ = tokio::time::sleep(deadline) => true,
                }
            }
            None => {
                dispatch_fut.await;
                false
            }
        };

        let mut completed_map = completed.lock().await;
        let critical_hit = critical_failed.load(Ordering::Acquire);
        let results = item_order
            .into_iter()
            .map(|request_id| {
                completed_map
                    .remove(&request_id)
                    .unwrap_or_else(|| BatchItemResult {
                        request_id,
                        elapsed: Duration::ZERO,
                        outcome: Err(if timed_out {
                            ExecutorError::Cancelled
                        } else {
                            ExecutorError::CriticalFailureUpstream
                        }),
                    })
            })
            .collect();

        let (completed_flag, termination_reason) = if timed_out {
            (false, Some("batch timeout".to_string()))
        } else if critical_hit {
            (false, Some("Critical request failed".to_string()))
        } else {
            (true, None)
        };

        BatchOutcome {
            batch_id,
            results,
            completed: completed_flag,
            cancelled: timed_out,
            termination_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap as StdHashMap;

    #[derive(Clone)]
    enum Script {
        Ok(Duration),
        Err(Duration),
        Hang,
    }

    struct ScriptedRunner {
        script: StdHashMap<String, Script>,
    }

    #[async_trait]
    impl RequestRunner<String, String, String> for ScriptedRunner {
        async fn run(&self, request: &String) -> Result<String, String> {
            match self.script.get(request) {
                Some(Script::Ok(delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(format!("{request}-ok"))
                }
                Some(Script::Err(delay)) => {
                    tokio::time::sleep(*delay).await;
                    Err(format!("{request}-failed"))
                }
                Some(Script::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!()
                }
                None => Err("unscripted".to_string()),
            }
        }
    }

    fn item(id: &str) -> crate::types::BatchItem<String> {
        crate::types::BatchItem::new(id, id.to_string())
    }

    #[tokio::test]
    async fn test_results_preserve_input_order_and_cardinality() {
        let mut script = StdHashMap::new();
        script.insert("a".to_string(), Script::Ok(Duration::from_millis(30)));
        script.insert("b".to_string(), Script::Ok(Duration::from_millis(5)));
        script.insert("c".to_string(), Script::Ok(Duration::from_millis(15)));
        let executor = BatchExecutor::new(Arc::new(ScriptedRunner { script }));

        let mut batch = BatchRequest::new("b1", vec![item("a"), item("b"), item("c")]);
        batch.max_concurrent = 3;

        let outcome = executor.execute(batch).await;
        let ids: Vec<_> = outcome.results.iter().map(|r| r.request_id.clone()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.completed);
        assert_eq!(outcome.successful_count(), 3);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_the_batch_unless_critical() {
        let mut script = StdHashMap::new();
        script.insert("a".to_string(), Script::Ok(Duration::from_millis(1)));
        script.insert("b".to_string(), Script::Err(Duration::from_millis(1)));
        script.insert("c".to_string(), Script::Ok(Duration::from_millis(1)));
        let executor = BatchExecutor::new(Arc::new(ScriptedRunner { script }));

        let mut batch = BatchRequest::new("b1", vec![item("a"), item("b"), item("c")]);
        batch.max_concurrent = 3;

        let outcome = executor.execute(batch).await;
        assert!(outcome.completed);
        assert_eq!(outcome.successful_count(), 2);
        assert_eq!(outcome.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_critical_failure_short_circuits_remaining_dispatch() {
        let mut script = StdHashMap::new();
        script.insert("a".to_string(), Script::Err(Duration::from_millis(1)));
        script.insert("b".to_string(), Script::Ok(Duration::from_millis(1)));
        let executor = BatchExecutor::new(Arc::new(ScriptedRunner { script }));

        let mut batch = BatchRequest::new(
            "b1",
            vec![item("a").critical(), item("b")],
        );
        batch.max_concurrent = 1; // force sequential dispatch so "a" finishes before "b" starts

        let outcome = executor.execute(batch).await;
        assert!(!outcome.completed);
        assert!(outcome.termination_reason.unwrap().contains("Critical"));
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results[0].outcome.is_err());
    }

    #[tokio::test]
    async fn test_batch_deadline_cancels_in_flight_work() {
        let mut script = StdHashMap::new();
        script.insert("a".to_string(), Script::Ok(Duration::from_millis(5)));
        script.insert("b".to_string(), Script::Hang);
        let executor = BatchExecutor::new(Arc::new(ScriptedRunner { script }));

        let mut batch = BatchRequest::new("b1", vec![item("a"), item("b")]);
        batch.max_concurrent = 2;
        batch.batch_deadline = Some(Duration::from_millis(50));

        let outcome = executor.execute(batch).await;
        assert!(outcome.cancelled);
        assert!(outcome.termination_reason.unwrap().contains("timeout"));
        assert_eq!(outcome.results.len(), 2);
        // "a" had time to complete; "b" did not.
        assert!(outcome.results[0].outcome.is_ok());
        assert!(outcome.results[1].outcome.is_err());
    }

    #[tokio::test]
    async fn test_per_request_deadline_reports_timeout_without_aborting_batch() {
        let mut script = StdHashMap::new();
        script.insert("a".to_string(), Script::Hang);
        script.insert("b".to_string(), Script::Ok(Duration::from_millis(1)));
        let executor = BatchExecutor::new(Arc::new(ScriptedRunner { script }));

        let mut batch = BatchRequest::new("b1", vec![item("a"), item("b")]);
        batch.max_concurrent = 2;
        batch.per_request_deadline = Duration::from_millis(20);

        let outcome = executor.execute(batch).await;
        assert!(outcome.completed);
        assert!(matches!(
            outcome.results[0].outcome,
            Err(ExecutorError::Timeout)
        ));
        assert!(outcome.results[1].outcome.is_ok());
    }

    #[tokio::test]
    async fn test_closed_executor_rejects_new_submissions() {
        let executor: BatchExecutor<String, String, String> =
            BatchExecutor::new(Arc::new(ScriptedRunner {
                script: StdHashMap::new(),
            }));
        executor.shutdown();

        let outcome = executor.execute(BatchRequest::new("b1", vec![item("a")])).await;
        assert!(outcome.cancelled);
        assert!(!outcome.completed);
        assert!(outcome.results[0].outcome.is_err());
    }
}
