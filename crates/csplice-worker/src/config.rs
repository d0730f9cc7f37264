//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use csplice_ai_client::ExtractionParams;
use csplice_models::{export::DEFAULT_EXPORT_TTL_DAYS, Platform, Resolution};
use csplice_queue::DEFAULT_QUEUE_CAPACITY;
use tracing::warn;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Maximum concurrent FFmpeg processes across all jobs
    pub max_ffmpeg_processes: usize,
    /// Pending jobs the queue holds before triggers wait
    pub queue_capacity: usize,
    /// Watchdog for a single ffmpeg/ffprobe invocation
    pub ffmpeg_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Where ingested source files live
    pub upload_dir: PathBuf,
    /// Where splice and export artifacts are written
    pub export_dir: PathBuf,
    /// Temporary clip extractions
    pub scratch_dir: PathBuf,
    pub thumbnail_dir: PathBuf,
    /// Canvas size for composed splices
    pub splice_resolution: Resolution,
    pub splice_fps: u32,
    /// Clip extraction tuning sent to the AI service
    pub extraction: ExtractionParams,
    /// Days an export stays downloadable
    pub export_ttl_days: i64,
    /// Platform named in caption and hashtag requests
    pub caption_platform: Platform,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            max_ffmpeg_processes: 4,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            ffmpeg_timeout: Duration::from_secs(1800),
            shutdown_timeout: Duration::from_secs(30),
            upload_dir: PathBuf::from("/tmp/csplice/uploads"),
            export_dir: PathBuf::from("/tmp/csplice/exports"),
            scratch_dir: PathBuf::from("/tmp/csplice/scratch"),
            thumbnail_dir: PathBuf::from("/tmp/csplice/thumbnails"),
            splice_resolution: Resolution::default(),
            splice_fps: 30,
            extraction: ExtractionParams::default(),
            export_ttl_days: DEFAULT_EXPORT_TTL_DAYS,
            caption_platform: Platform::Tiktok,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: env_or("WORKER_MAX_JOBS", defaults.max_concurrent_jobs).max(1),
            max_ffmpeg_processes: env_or("WORKER_MAX_FFMPEG", defaults.max_ffmpeg_processes).max(1),
            queue_capacity: env_or("WORKER_QUEUE_CAPACITY", defaults.queue_capacity),
            ffmpeg_timeout: Duration::from_secs(env_or("WORKER_FFMPEG_TIMEOUT", 1800)),
            shutdown_timeout: Duration::from_secs(env_or("WORKER_SHUTDOWN_TIMEOUT", 30)),
            upload_dir: env_path("WORKER_UPLOAD_DIR", defaults.upload_dir),
            export_dir: env_path("WORKER_EXPORT_DIR", defaults.export_dir),
            scratch_dir: env_path("WORKER_SCRATCH_DIR", defaults.scratch_dir),
            thumbnail_dir: env_path("WORKER_THUMBNAIL_DIR", defaults.thumbnail_dir),
            splice_resolution: env_or("SPLICE_RESOLUTION", defaults.splice_resolution),
            splice_fps: env_or("SPLICE_FPS", defaults.splice_fps),
            extraction: ExtractionParams {
                sensitivity: env_or("CLIP_SENSITIVITY", defaults.extraction.sensitivity),
                min_duration: env_or("MIN_CLIP_DURATION", defaults.extraction.min_duration),
                max_duration: env_or("MAX_CLIP_DURATION", defaults.extraction.max_duration),
                max_clips: env_or("MAX_CLIPS_PER_VIDEO", defaults.extraction.max_clips),
            },
            export_ttl_days: env_or("EXPORT_TTL_DAYS", defaults.export_ttl_days),
            caption_platform: env_or("CAPTION_PLATFORM", defaults.caption_platform),
        }
    }

    /// Export download window.
    pub fn export_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.export_ttl_days)
    }

    /// Config rooted in one directory, used by tests and local runs.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            upload_dir: root.join("uploads"),
            export_dir: root.join("exports"),
            scratch_dir: root.join("scratch"),
            thumbnail_dir: root.join("thumbnails"),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.max_ffmpeg_processes, 4);
        assert_eq!(config.ffmpeg_timeout, Duration::from_secs(1800));
        assert_eq!(config.splice_resolution.to_string(), "1080x1920");
        assert_eq!(config.extraction.sensitivity, 0.75);
        assert_eq!(config.export_ttl(), chrono::Duration::days(7));
        assert_eq!(config.caption_platform, Platform::Tiktok);
    }

    #[test]
    fn test_rooted_at() {
        let config = WorkerConfig::rooted_at("/data");
        assert_eq!(config.scratch_dir, PathBuf::from("/data/scratch"));
        assert_eq!(config.export_dir, PathBuf::from("/data/exports"));
    }
}
