//! FFmpeg CLI wrapper for the splice pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - A runner with a watchdog timeout, progress parsing and stderr capture
//! - Media probing via ffprobe
//! - Clip extraction, multi-stream composition and platform re-encoding
//! - Thumbnail frames

pub mod clip;
pub mod command;
pub mod compose;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod platform;
pub mod probe;
pub mod progress;
pub mod thumbnail;

pub use clip::{extract_clip, ClipExtraction};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compose::{compose, Composition};
pub use error::{MediaError, MediaResult};
pub use platform::{optimize, Optimization};
pub use probe::{probe_video, probe_video_with_timeout, VideoInfo};
pub use progress::FfmpegProgress;
pub use thumbnail::{generate_thumbnail, Thumbnail};
