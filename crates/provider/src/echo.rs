//! An entirely in-memory adapter: echoes the prompt back as the response.
//! Used for dry-run benchmarking of the pipeline itself without a live
//! endpoint, and as the executor's default `RequestRunner` in tests.

use loadbench_executor::RequestRunner;

use crate::adapter::{ChatRequest, ChatResponse, ProviderAdapter};
use crate::error::ProviderError;

#[derive(Debug, Clone, Default)]
pub struct EchoAdapter;

#[async_trait::async_trait]
impl ProviderAdapter for EchoAdapter {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        Ok(ChatResponse {
            text: request.prompt.clone(),
            success: true,
            error: None,
            prompt_tokens: Some((request.prompt.len() / 4) as u32),
            completion_tokens: Some((request.prompt.len() / 4) as u32),
        })
    }

    async fn complete_stream(
        &self,
        request: &ChatRequest,
        sink: tokio::sync::mpsc::Sender<String>,
    ) -> Result<ChatResponse, ProviderError> {
        for word in request.prompt.split_inclusive(' ') {
            if sink.send(word.to_string()).await.is_err() {
                break;
            }
        }
        self.complete(request).await
    }
}

/// Adapts [`EchoAdapter`] to [`RequestRunner`] so it can be submitted
/// through a `BatchExecutor` exactly like a live provider.
pub struct EchoRunner {
    adapter: EchoAdapter,
}

impl EchoRunner {
    pub fn new() -> Self {
        Self {
            adapter: EchoAdapter,
        }
    }
}

impl Default for EchoRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RequestRunner<ChatRequest, ChatResponse, ProviderError> for EchoRunner {
    async fn run(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.adapter.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_returns_the_prompt_verbatim() {
        let adapter = EchoAdapter;
        let request = ChatRequest::new("echo", "hello world");
        let response = adapter.complete(&request).await.unwrap();
        assert_eq!(response.text, "hello world");
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_echo_runner_satisfies_the_request_runner_contract() {
        let runner = EchoRunner::new();
        let request = ChatRequest::new("echo", "ping");
        let response = runner.run(&request).await.unwrap();
        assert_eq!(response.text, "ping");
    }
}
