//! Clip extraction.

use std::path::PathBuf;
use tracing::info;

use csplice_models::{encoding::PIXEL_FORMAT, EncodingConfig};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// A time range to cut out of a source file.
#[derive(Debug, Clone)]
pub struct ClipExtraction {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub include_audio: bool,
}

impl ClipExtraction {
    pub fn new(
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        start: f64,
        end: f64,
    ) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            start,
            end,
            include_audio: true,
        }
    }

    pub fn without_audio(mut self) -> Self {
        self.include_audio = false;
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    fn validate(&self) -> MediaResult<()> {
        if !self.start.is_finite() || !self.end.is_finite() || self.start < 0.0 || self.end <= self.start {
            return Err(MediaError::invalid_input(format!(
                "clip range {:.3}..{:.3} is empty or negative",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// Build the extraction command.
///
/// The clip is always re-encoded so every extracted file shares codec,
/// pixel format and timestamps, and the cut lands on the exact start time.
pub fn build_extract_command(request: &ClipExtraction, encoding: &EncodingConfig) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(&request.source, &request.output)
        .seek(request.start)
        .duration(request.duration())
        .video_encoding(encoding)
        .pixel_format(PIXEL_FORMAT);

    let cmd = if request.include_audio {
        cmd.audio_encoding(encoding)
    } else {
        cmd.no_audio()
    };

    cmd.output_args(["-avoid_negative_ts", "make_zero"])
}

/// Extract one clip with the fixed extraction profile.
///
/// Writes exactly one file at `request.output`. A failed run may leave a
/// partial file behind; the caller owns its removal.
pub async fn extract_clip(request: &ClipExtraction, runner: &FfmpegRunner) -> MediaResult<()> {
    request.validate()?;
    if !request.source.exists() {
        return Err(MediaError::FileNotFound(request.source.clone()));
    }

    info!(
        "Extracting clip: {} -> {} ({:.2}s..{:.2}s)",
        request.source.display(),
        request.output.display(),
        request.start,
        request.end
    );

    let cmd = build_extract_command(request, &EncodingConfig::for_extraction());
    runner.run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_command_args() {
        let request = ClipExtraction::new("/in/source.mp4", "/tmp/clip.mp4", 12.5, 20.0);
        let args = build_extract_command(&request, &EncodingConfig::for_extraction()).build_args();
        let joined = args.join(" ");

        assert!(joined.contains("-ss 12.500 -t 7.500 -i /in/source.mp4"));
        assert!(joined.contains("-c:v libx264 -preset fast -crf 23"));
        assert!(joined.contains("-c:a aac"));
        assert!(!joined.contains("-c copy"));
        assert!(!joined.contains("-an"));
        assert_eq!(args.last().unwrap(), "/tmp/clip.mp4");
    }

    #[test]
    fn test_extract_without_audio() {
        let request = ClipExtraction::new("a.mp4", "b.mp4", 0.0, 5.0).without_audio();
        let args = build_extract_command(&request, &EncodingConfig::for_extraction()).build_args();
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"-c:a".to_string()));
    }

    #[tokio::test]
    async fn test_rejects_empty_range() {
        let request = ClipExtraction::new("a.mp4", "b.mp4", 5.0, 5.0);
        let err = extract_clip(&request, &FfmpegRunner::new()).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let request = ClipExtraction::new("/nonexistent/source.mp4", "/tmp/out.mp4", 0.0, 5.0);
        let err = extract_clip(&request, &FfmpegRunner::new()).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
