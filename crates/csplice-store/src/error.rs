//! Store error types.

use thiserror::Error;

use csplice_models::ModelError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    /// A check-and-set status transition found an unexpected status.
    #[error("{kind} {id} is {current}, cannot move to {next}")]
    StatusConflict {
        kind: &'static str,
        id: String,
        current: String,
        next: String,
    },

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] ModelError),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn is_status_conflict(&self) -> bool {
        matches!(self, Self::StatusConflict { .. })
    }
}
