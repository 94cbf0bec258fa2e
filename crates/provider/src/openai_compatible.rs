//! OpenAI-compatible provider adapter — works against vLLM, Ollama, the
//! OpenAI API itself, and anything else speaking the §4.4 wire shape.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{header, Method};
use loadbench_transport::{HttpClient, HttpRequest, ReceiveMode};
use url::Url;

use crate::adapter::{ChatRequest, ChatResponse, ProviderAdapter};
use crate::error::ProviderError;
use crate::wire::{self, WireChatRequest, WireChatResponse, WireMessage};

/// Points at a `{base_url}/chat/completions` endpoint and speaks the shared
/// wire contract. Covers OpenAI, Azure OpenAI, vLLM, Ollama, LocalAI,
/// Together.ai and any other OpenAI-compatible server.
pub struct OpenAiCompatible {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: Option<String>,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl OpenAiCompatible {
    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    fn endpoint(&self) -> Result<Url, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        Url::parse(&url).map_err(|e| ProviderError::InvalidUrl(e.to_string()))
    }

    fn wire_request(&self, request: &ChatRequest) -> WireChatRequest {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let p = &request.parameters;
        WireChatRequest {
            model: request.model.clone(),
            messages,
            temperature: p.temperature,
            top_p: p.top_p,
            max_tokens: p.max_tokens,
            stream: p.stream,
            frequency_penalty: p.frequency_penalty,
            presence_penalty: p.presence_penalty,
            stop: p.stop.clone(),
        }
    }

    fn build_http_request(&self, wire: &WireChatRequest) -> Result<HttpRequest, ProviderError> {
        let url = self.endpoint()?;
        let body = serde_json::to_vec(wire)?;
        let mut req = HttpRequest::new(Method::POST, url, self.connect_timeout.max(self.read_timeout))
            .with_header(header::CONTENT_TYPE, "application/json")
            .with_body(Bytes::from(body));
        if let Some(key) = &self.api_key {
            req = req.with_header(header::AUTHORIZATION, &format!("Bearer {key}"));
        }
        Ok(req)
    }
}

fn decode(wire: WireChatResponse) -> Result<ChatResponse, ProviderError> {
    let choice = wire.choices.into_iter().next().ok_or(ProviderError::NoChoices)?;
    let text = choice
        .message
        .and_then(|m| m.content)
        .unwrap_or_default();
    Ok(ChatResponse {
        text,
        success: true,
        error: None,
        prompt_tokens: wire.usage.as_ref().map(|u| u.prompt_tokens),
        completion_tokens: wire.usage.as_ref().map(|u| u.completion_tokens),
    })
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiCompatible {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let wire = self.wire_request(request);
        let http_request = self.build_http_request(&wire)?;
        let response = self
            .client
            .execute(&http_request, ReceiveMode::default())
            .await?;
        let parsed: WireChatResponse = serde_json::from_slice(&response.body)?;
        decode(parsed)
    }

    async fn complete_stream(
        &self,
        request: &ChatRequest,
        sink: tokio::sync::mpsc::Sender<String>,
    ) -> Result<ChatResponse, ProviderError> {
        let mut wire = self.wire_request(request);
        wire.stream = true;
        let http_request = self.build_http_request(&wire)?;

        let (raw_tx, mut raw_rx) = tokio::sync::mpsc::channel::<String>(64);
        let forward = tokio::spawn(async move {
            let mut text = String::new();
            while let Some(raw) = raw_rx.recv().await {
                if let Some(delta) = wire::decode_stream_chunk(&raw) {
                    text.push_str(&delta);
                    if sink.send(delta).await.is_err() {
                        break;
                    }
                }
            }
            text
        });

        self.client.execute_streaming(&http_request, raw_tx).await?;
        let text = forward.await.unwrap_or_default();

        Ok(ChatResponse {
            text,
            success: true,
            error: None,
            prompt_tokens: None,
            completion_tokens: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash_from_base_url() {
        let adapter = OpenAiCompatible::new(
            Arc::new(HttpClient::new(Default::default())),
            "http://localhost:8000/v1/",
            None,
        );
        assert_eq!(
            adapter.endpoint().unwrap().as_str(),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn test_wire_request_applies_parameter_defaults() {
        let adapter = OpenAiCompatible::new(
            Arc::new(HttpClient::new(Default::default())),
            "http://localhost:8000/v1",
            None,
        );
        let request = ChatRequest::new("llama3", "hello");
        let wire = adapter.wire_request(&request);
        assert_eq!(wire.temperature, 0.7);
        assert_eq!(wire.max_tokens, 2048);
        assert_eq!(wire.messages.len(), 1);
        assert_eq!(wire.messages[0].role, "user");
    }

    #[test]
    fn test_wire_request_prepends_system_prompt() {
        let adapter = OpenAiCompatible::new(
            Arc::new(HttpClient::new(Default::default())),
            "http://localhost:8000/v1",
            None,
        );
        let request = ChatRequest::new("llama3", "hello").with_system_prompt("be terse");
        let wire = adapter.wire_request(&request);
        assert_eq!(wire.messages.len(), 2);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.messages[1].role, "user");
    }

    #[test]
    fn test_decode_surfaces_usage_tokens() {
        let wire = WireChatResponse {
            id: "x".to_string(),
            object: "chat.completion".to_string(),
            created: 0,
            model: "llama3".to_string(),
            choices: vec![wire::WireChoice {
                index: 0,
                message: Some(wire::WireMessageResponse {
                    role: Some("assistant".to_string()),
                    content: Some("hi".to_string()),
                }),
                delta: None,
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(wire::WireUsage {
                prompt_tokens: 5,
                completion_tokens: 2,
                total_tokens: 7,
            }),
        };
        let resp = decode(wire).unwrap();
        assert_eq!(resp.text, "hi");
        assert_eq!(resp.completion_tokens, Some(2));
    }

    #[test]
    fn test_decode_fails_on_empty_choices() {
        let wire = WireChatResponse {
            id: String::new(),
            object: String::new(),
            created: 0,
            model: String::new(),
            choices: vec![],
            usage: None,
        };
        assert!(matches!(decode(wire), Err(ProviderError::NoChoices)));
    }
}
