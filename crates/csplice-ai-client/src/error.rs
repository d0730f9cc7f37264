//! AI client error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Terminal failure of a retried call.
    #[error("{operation} failed after {attempts} attempt(s): {message}")]
    ExternalApi {
        operation: String,
        attempts: u32,
        message: String,
    },
}

impl AiError {
    pub fn external_api(operation: impl Into<String>, attempts: u32, message: impl Into<String>) -> Self {
        Self::ExternalApi {
            operation: operation.into(),
            attempts,
            message: message.into(),
        }
    }

    /// Transport failures and non-2xx responses are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AiError::Network(_) | AiError::Status { .. })
    }

    pub fn is_external_api(&self) -> bool {
        matches!(self, AiError::ExternalApi { .. })
    }
}
