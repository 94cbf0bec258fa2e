//! Top-level error type (§7). Aggregates the error kinds surfaced by each
//! lower layer; a non-zero process exit happens only when no evaluation
//! produced any result.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadbenchError>;

#[derive(Debug, Error)]
pub enum LoadbenchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("prompt dataset error: {0}")]
    Dataset(String),

    #[error(transparent)]
    Transport(#[from] loadbench_transport::TransportError),

    #[error(transparent)]
    Provider(#[from] loadbench_provider::ProviderError),

    #[error(transparent)]
    Pool(#[from] loadbench_resilience::ResilienceError),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LoadbenchError {
    /// Config and dataset errors are unrecoverable for the run; transport
    /// and provider failures are per-request and never reach this type
    /// except during setup (e.g. an invalid endpoint URL).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoadbenchError::Config(_) | LoadbenchError::Dataset(_) | LoadbenchError::InvalidUrl(_)
        )
    }
}
