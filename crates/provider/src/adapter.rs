//! The provider contract (C4): map a logical chat request to a wire
//! request, and decode a wire response back into text + usage.

use async_trait::async_trait;

use crate::error::ProviderError;

/// Parameter defaults per spec §4.4.
#[derive(Debug, Clone)]
pub struct ChatParameters {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stop: Vec<String>,
    pub stream: bool,
}

impl Default for ChatParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 2048,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: Vec::new(),
            stream: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub parameters: ChatParameters,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            prompt: prompt.into(),
            parameters: ChatParameters::default(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_parameters(mut self, parameters: ChatParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub text: String,
    pub success: bool,
    pub error: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// One adapter per provider flavour. Production code composes this with an
/// `loadbench_transport::HttpClient`; the wire shape is fixed (§4.4), but a
/// provider may still diverge in endpoint path or auth header conventions.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Issue one non-streaming chat completion and return its decoded
    /// result.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Issue a streaming chat completion, forwarding decoded delta text to
    /// `sink` as it arrives. Returns the fully concatenated text on
    /// completion.
    async fn complete_stream(
        &self,
        request: &ChatRequest,
        sink: tokio::sync::mpsc::Sender<String>,
    ) -> Result<ChatResponse, ProviderError>;
}
