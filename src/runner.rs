//! Adapts a [`ProviderAdapter`] into a [`RequestRunner`] so it can be
//! submitted through `loadbench-executor`'s `BatchExecutor`, gating every
//! dispatch through a [`RateGate`] first (C5 "throttles via C7" per §2's
//! data-flow description).

use std::sync::Arc;

use async_trait::async_trait;
use loadbench_executor::RequestRunner;
use loadbench_provider::{ChatRequest, ChatResponse, ProviderAdapter, ProviderError};

use crate::rate_gate::RateGate;

pub struct AdapterRunner {
    adapter: Arc<dyn ProviderAdapter>,
    rate_gate: RateGate,
    streaming: bool,
}

impl AdapterRunner {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, rate_gate: RateGate, streaming: bool) -> Self {
        Self {
            adapter,
            rate_gate,
            streaming,
        }
    }
}

#[async_trait]
impl RequestRunner<ChatRequest, ChatResponse, ProviderError> for AdapterRunner {
    async fn run(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.rate_gate.acquire().await;

        if self.streaming {
            let (tx, mut rx) = tokio::sync::mpsc::channel(64);
            let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });
            let response = self.adapter.complete_stream(request, tx).await;
            let _ = drain.await;
            response
        } else {
            self.adapter.complete(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadbench_executor::{BatchExecutor, BatchItem, BatchRequest};
    use loadbench_provider::EchoAdapter;

    #[tokio::test]
    async fn test_non_streaming_runner_delegates_to_complete() {
        let runner = AdapterRunner::new(Arc::new(EchoAdapter), RateGate::None, false);
        let response = runner.run(&ChatRequest::new("echo", "hi")).await.unwrap();
        assert_eq!(response.text, "hi");
    }

    #[tokio::test]
    async fn test_streaming_runner_drains_chunks_and_returns_final_response() {
        let runner = AdapterRunner::new(Arc::new(EchoAdapter), RateGate::None, true);
        let response = runner
            .run(&ChatRequest::new("echo", "hello world"))
            .await
            .unwrap();
        assert_eq!(response.text, "hello world");
    }

    #[tokio::test]
    async fn test_runner_is_usable_through_the_batch_executor() {
        let runner = Arc::new(AdapterRunner::new(Arc::new(EchoAdapter), RateGate::None, false));
        let executor = BatchExecutor::new(runner);
        let batch = BatchRequest::new(
            "b1",
            vec![BatchItem::new("r1", ChatRequest::new("echo", "ping"))],
        );
        let outcome = executor.execute(batch).await;
        assert!(outcome.completed);
        assert_eq!(outcome.successful_count(), 1);
    }
}
