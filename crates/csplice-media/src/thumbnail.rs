//! Poster frame extraction.

use std::path::PathBuf;
use tracing::info;

use csplice_models::encoding::THUMBNAIL_SCALE_WIDTH;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video_with_timeout;

/// A single JPEG frame grabbed from a video.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Frame time in seconds; the middle of the video when unset
    pub at: Option<f64>,
}

impl Thumbnail {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            at: None,
        }
    }

    pub fn at(mut self, seconds: f64) -> Self {
        self.at = Some(seconds);
        self
    }
}

pub fn build_thumbnail_command(request: &Thumbnail, at: f64) -> FfmpegCommand {
    FfmpegCommand::new(&request.source, &request.output)
        .seek(at.max(0.0))
        .video_filter(format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH))
        .output_args(["-frames:v", "1", "-c:v", "mjpeg", "-f", "image2"])
}

/// Write one frame of `request.source` to `request.output`.
pub async fn generate_thumbnail(request: &Thumbnail, runner: &FfmpegRunner) -> MediaResult<()> {
    if !request.source.exists() {
        return Err(MediaError::FileNotFound(request.source.clone()));
    }
    let at = match request.at {
        Some(at) if at.is_finite() && at >= 0.0 => at,
        Some(at) => {
            return Err(MediaError::invalid_input(format!(
                "thumbnail time {at} is not a valid position"
            )))
        }
        None => probe_video_with_timeout(&request.source, runner.timeout()).await?.duration / 2.0,
    };

    info!(
        "Generating thumbnail: {} -> {} at {:.2}s",
        request.source.display(),
        request.output.display(),
        at
    );
    runner.run(&build_thumbnail_command(request, at)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_command_grabs_one_frame() {
        let request = Thumbnail::new("/in/talk.mp4", "/thumbs/talk.jpg");
        let args = build_thumbnail_command(&request, 60.0).build_args();
        let joined = args.join(" ");

        assert!(joined.contains("-ss 60.000 -i /in/talk.mp4"));
        assert!(joined.contains("-vf scale=480:-2"));
        assert!(joined.contains("-frames:v 1 -c:v mjpeg -f image2"));
        assert_eq!(args.last().unwrap(), "/thumbs/talk.jpg");
    }

    #[tokio::test]
    async fn test_rejects_negative_time() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mp4");
        std::fs::write(&source, b"video").unwrap();

        let request = Thumbnail::new(&source, dir.path().join("t.jpg")).at(-1.0);
        let err = generate_thumbnail(&request, &FfmpegRunner::new()).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let request = Thumbnail::new("/nonexistent/talk.mp4", "/tmp/t.jpg");
        let err = generate_thumbnail(&request, &FfmpegRunner::new()).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
