//! Shared data models for the ClipSplice pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Source videos and their analysis status
//! - Clips (time-bounded segments with AI scores)
//! - Splices (ordered multi-clip compositions)
//! - Exports (platform-optimized renditions)
//! - Encoding profiles and output resolutions

pub mod clip;
pub mod encoding;
pub mod error;
pub mod export;
pub mod id;
pub mod resolution;
pub mod splice;
pub mod video;

// Re-export common types
pub use clip::Clip;
pub use encoding::{EncodingConfig, EXTRACTION_CRF, COMPOSITION_CRF};
pub use error::{ModelError, ModelResult};
pub use export::{Export, ExportOptions, ExportStatus, Platform, PlatformProfile};
pub use id::{ClipId, ExportId, JobId, SpliceId, VideoId};
pub use resolution::Resolution;
pub use splice::{Layout, Splice, SpliceClip, SpliceMode, SpliceStatus};
pub use video::{SourceVideo, VideoStatus};
