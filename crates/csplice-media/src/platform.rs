//! Platform-specific re-encoding.

use std::path::PathBuf;
use tracing::info;

use csplice_models::{encoding::PIXEL_FORMAT, Platform, Resolution};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::export_filter;

/// One export rendition request.
#[derive(Debug, Clone)]
pub struct Optimization {
    pub input: PathBuf,
    pub output: PathBuf,
    pub platform: Platform,
    pub resolution: Resolution,
    pub fps: u32,
    pub watermark_text: Option<String>,
}

pub fn build_optimize_command(request: &Optimization) -> FfmpegCommand {
    let encoding = request.platform.profile().encoding_config();

    FfmpegCommand::new(&request.input, &request.output)
        .video_filter(export_filter(request.resolution, request.watermark_text.as_deref()))
        .video_encoding(&encoding)
        .audio_encoding(&encoding)
        .pixel_format(PIXEL_FORMAT)
        .frame_rate(request.fps)
        .faststart()
}

/// Re-encode a splice for a platform.
pub async fn optimize(request: &Optimization, runner: &FfmpegRunner) -> MediaResult<()> {
    if !request.input.exists() {
        return Err(MediaError::FileNotFound(request.input.clone()));
    }

    info!(
        "Optimizing {} for {} at {} ({} fps)",
        request.input.display(),
        request.platform,
        request.resolution,
        request.fps
    );

    runner.run(&build_optimize_command(request)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(platform: Platform, watermark: Option<&str>) -> Optimization {
        Optimization {
            input: PathBuf::from("/tmp/splice.mp4"),
            output: PathBuf::from("/tmp/export.mp4"),
            platform,
            resolution: Resolution::new(1080, 1920).unwrap(),
            fps: 30,
            watermark_text: watermark.map(str::to_string),
        }
    }

    #[test]
    fn test_tiktok_profile() {
        let joined = build_optimize_command(&request(Platform::Tiktok, None))
            .build_args()
            .join(" ");
        assert!(joined.contains("-vf scale=1080:1920,setsar=1 "));
        assert!(joined.contains("-c:v libx264 -preset medium -crf 23 -b:v 2M"));
        assert!(joined.contains("-c:a aac -b:a 128k"));
        assert!(joined.contains("-r 30"));
    }

    #[test]
    fn test_youtube_shorts_profile() {
        let joined = build_optimize_command(&request(Platform::YoutubeShorts, None))
            .build_args()
            .join(" ");
        assert!(joined.contains("-crf 22 -b:v 3M"));
        assert!(joined.contains("-b:a 192k"));
    }

    #[test]
    fn test_generic_uses_encoder_defaults() {
        let args = build_optimize_command(&request(Platform::Generic, None)).build_args();
        assert!(!args.contains(&"-b:v".to_string()));
        assert!(!args.contains(&"-b:a".to_string()));
        assert!(args.join(" ").contains("-crf 23"));
    }

    #[test]
    fn test_watermark_is_drawn() {
        let joined = build_optimize_command(&request(Platform::InstagramReels, Some("Made with ClipSplice")))
            .build_args()
            .join(" ");
        assert!(joined.contains("drawtext=text=Made with ClipSplice"));
        assert!(joined.contains("-b:v 2.5M"));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let mut req = request(Platform::Tiktok, None);
        req.input = PathBuf::from("/nonexistent/splice.mp4");
        let err = optimize(&req, &FfmpegRunner::new()).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
