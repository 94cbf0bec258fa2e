//! Provider adapters (C4): map (prompt, parameters) to a wire request and
//! decode the wire response back into text + usage, per the shared
//! OpenAI-compatible JSON contract.

mod adapter;
mod echo;
mod error;
mod openai_compatible;
mod wire;

pub use adapter::{ChatParameters, ChatRequest, ChatResponse, ProviderAdapter};
pub use echo::{EchoAdapter, EchoRunner};
pub use error::ProviderError;
pub use openai_compatible::OpenAiCompatible;
pub use wire::{WireChatRequest, WireChatResponse, WireChoice, WireMessage, WireUsage};
