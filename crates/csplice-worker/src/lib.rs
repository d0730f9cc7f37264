//! Splice pipeline worker.
//!
//! This crate provides:
//! - The orchestrator driving video analysis, splice rendering and exports
//! - AI-driven clip selection with deterministic fallback ranking
//! - A bounded job executor fed by the in-process job queue
//! - Structured job logging and pipeline metrics

pub mod backend;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod selector;

pub use backend::{AnalysisBackend, FfmpegBackend, MediaBackend};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use orchestrator::{Orchestrator, SpliceRequest, StageOutcome};
pub use selector::{ClipSelector, Selection, SelectionSource};
