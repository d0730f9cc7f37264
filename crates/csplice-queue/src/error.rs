//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,

    #[error("Queue is full (capacity {0})")]
    Full(usize),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
