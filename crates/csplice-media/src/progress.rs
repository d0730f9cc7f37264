//! Parsing of ffmpeg's `-progress pipe:2` stream.
//!
//! ffmpeg interleaves `key=value` progress blocks with ordinary diagnostics on
//! stderr. [`ProgressParser`] separates the two and emits a snapshot at the
//! end of each block.

use serde::{Deserialize, Serialize};

/// Snapshot of encoder progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    pub fps: f64,
    /// Encoded output position in milliseconds
    pub out_time_ms: i64,
    /// Multiple of realtime
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percent done for an output expected to last `total_secs`.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if total_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / 10.0 / total_secs).clamp(0.0, 100.0)
    }
}

/// What a stderr line turned out to be.
#[derive(Debug, PartialEq)]
pub(crate) enum StderrLine {
    /// Part of a progress block; carries a snapshot when the block closed.
    Progress(Option<FfmpegProgress>),
    Diagnostic,
}

#[derive(Debug, Default)]
pub(crate) struct ProgressParser {
    current: FfmpegProgress,
}

impl ProgressParser {
    pub(crate) fn feed(&mut self, line: &str) -> StderrLine {
        let Some((key, value)) = line.trim().split_once('=') else {
            return StderrLine::Diagnostic;
        };
        let value = value.trim();
        match key {
            // Both carry microseconds in current ffmpeg releases.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            "frame" => self.current.frame = value.parse().unwrap_or(self.current.frame),
            "fps" => self.current.fps = value.parse().unwrap_or(self.current.fps),
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.current.speed = speed;
                }
            }
            "progress" => {
                self.current.is_complete = value == "end";
                return StderrLine::Progress(Some(self.current.clone()));
            }
            "bitrate" | "total_size" | "out_time" | "dup_frames" | "drop_frames" => {}
            k if k.starts_with("stream_") => {}
            _ => return StderrLine::Diagnostic,
        }
        StderrLine::Progress(None)
    }
}
