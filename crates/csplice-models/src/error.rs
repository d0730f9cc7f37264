//! Model invariant violations.

use thiserror::Error;

/// Result type for model construction and validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when a value would break a data-model invariant.
///
/// Every variant is a precondition failure and surfaces to callers as a
/// validation error before any state is mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid time range: start {start:.3}s must be >= 0 and before end {end:.3}s")]
    InvalidTimeRange { start: f64, end: f64 },

    #[error("Clip end {end:.3}s exceeds video duration {duration:.3}s")]
    ExceedsVideoDuration { end: f64, duration: f64 },

    #[error("Invalid resolution '{0}', expected WxH with positive even dimensions")]
    InvalidResolution(String),

    #[error("Invalid clip positions: {0}")]
    InvalidPositions(String),

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Invalid field: {0}")]
    InvalidField(String),
}

impl ModelError {
    pub fn invalid_positions(msg: impl Into<String>) -> Self {
        Self::InvalidPositions(msg.into())
    }

    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::InvalidField(msg.into())
    }

    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ModelError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidField(errors.to_string())
    }
}
