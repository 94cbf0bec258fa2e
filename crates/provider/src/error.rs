use loadbench_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response carried no choices")]
    NoChoices,
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}
