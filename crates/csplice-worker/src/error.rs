//! Worker error types.

use thiserror::Error;

use csplice_ai_client::AiError;
use csplice_media::MediaError;
use csplice_models::ModelError;
use csplice_queue::QueueError;
use csplice_store::StoreError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Pipeline errors.
///
/// `Validation` is raised before any state changes. `Processing`, `Media`
/// and `ExternalApi` happen inside a stage and are recorded on the entity
/// as FAILED with the error text.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Processing failed: {0}")]
    Processing(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    pub fn external_api(msg: impl Into<String>) -> Self {
        Self::ExternalApi(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_external_api(&self) -> bool {
        matches!(self, Self::ExternalApi(_))
    }

    /// Media and processing failures.
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing(_) | Self::Media(_))
    }
}

impl From<AiError> for WorkerError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Config(msg) => Self::Config(msg),
            other => Self::ExternalApi(other.to_string()),
        }
    }
}

impl From<ModelError> for WorkerError {
    fn from(err: ModelError) -> Self {
        Self::Validation(err.to_string())
    }
}
