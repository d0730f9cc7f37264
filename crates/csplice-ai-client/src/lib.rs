//! Client for the external AI analysis service.
//!
//! Video analysis, clip extraction and splice recommendations are retried
//! with exponential backoff and surface as [`AiError::ExternalApi`] once
//! retries are exhausted. Caption and hashtag generation are best-effort.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod types;

pub use client::AnalysisClient;
pub use config::AiClientConfig;
pub use error::{AiError, AiResult};
pub use retry::{retry_with_policy, RetryPolicy, Sleeper, TokioSleeper};
pub use types::{ClipCandidate, ClipDescriptor, ExtractionParams, SpliceRecommendation};
