//! Multi-stream composition.

use std::path::PathBuf;
use tracing::{debug, info};

use csplice_models::{encoding::PIXEL_FORMAT, EncodingConfig, Layout, Resolution};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{composition_graph, AUDIO_OUT, VIDEO_OUT};
use crate::probe::probe_video_with_timeout;

/// Inputs and target format for one composition.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Input files in position order
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub layout: Layout,
    pub resolution: Resolution,
    pub fps: u32,
}

/// Build the composition command once input audio presence is known.
pub fn build_compose_command(
    composition: &Composition,
    has_audio: &[bool],
    encoding: &EncodingConfig,
) -> MediaResult<FfmpegCommand> {
    if has_audio.len() != composition.inputs.len() {
        return Err(MediaError::internal("audio flags do not match inputs"));
    }
    let graph = composition_graph(composition.layout, composition.resolution, has_audio)?;

    let mut cmd = FfmpegCommand::with_inputs(&composition.inputs, &composition.output)
        .filter_complex(graph.filter)
        .map(VIDEO_OUT)
        .video_encoding(encoding)
        .pixel_format(PIXEL_FORMAT)
        .frame_rate(composition.fps);

    cmd = if graph.has_audio {
        cmd.map(AUDIO_OUT).audio_encoding(encoding)
    } else {
        cmd.no_audio()
    };

    Ok(cmd.faststart())
}

/// Compose 2-4 clips into one video.
///
/// The output lasts as long as the longest input: shorter video streams
/// hold their last frame and audio is mixed for the longest track.
/// Inputs are never removed here.
pub async fn compose(composition: &Composition, runner: &FfmpegRunner) -> MediaResult<()> {
    composition
        .layout
        .validate_clip_count(composition.inputs.len())
        .map_err(|e| MediaError::unsupported_layout(e.to_string()))?;

    let mut has_audio = Vec::with_capacity(composition.inputs.len());
    let mut longest = 0.0_f64;
    for input in &composition.inputs {
        let info = probe_video_with_timeout(input, runner.timeout()).await?;
        longest = longest.max(info.duration);
        has_audio.push(info.has_audio);
    }

    info!(
        "Composing {} inputs ({}, {}) -> {}",
        composition.inputs.len(),
        composition.layout,
        composition.resolution,
        composition.output.display()
    );

    let cmd = build_compose_command(composition, &has_audio, &EncodingConfig::for_composition())?;
    runner
        .run_with_progress(&cmd, move |progress| {
            debug!(
                percent = progress.percentage(longest),
                speed = progress.speed,
                "Composition progress"
            );
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composition(n: usize, layout: Layout) -> Composition {
        Composition {
            inputs: (0..n).map(|i| PathBuf::from(format!("/tmp/c{i}.mp4"))).collect(),
            output: PathBuf::from("/tmp/out.mp4"),
            layout,
            resolution: Resolution::new(1080, 1920).unwrap(),
            fps: 30,
        }
    }

    #[test]
    fn test_compose_command() {
        let cmd = build_compose_command(
            &composition(2, Layout::SplitScreen),
            &[true, true],
            &EncodingConfig::for_composition(),
        )
        .unwrap();
        let joined = cmd.build_args().join(" ");

        assert!(joined.contains("-i /tmp/c0.mp4 -i /tmp/c1.mp4"));
        assert!(joined.contains("-map [vout]"));
        assert!(joined.contains("-map [aout]"));
        assert!(joined.contains("-preset medium -crf 23"));
        assert!(joined.contains("-r 30"));
    }

    #[test]
    fn test_compose_without_audio() {
        let cmd = build_compose_command(
            &composition(3, Layout::Grid),
            &[false, false, false],
            &EncodingConfig::for_composition(),
        )
        .unwrap();
        let args = cmd.build_args();
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"[aout]".to_string()));
    }

    #[tokio::test]
    async fn test_rejects_bad_input_count() {
        let err = compose(&composition(3, Layout::SplitScreen), &FfmpegRunner::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedLayout(_)));

        let err = compose(&composition(5, Layout::Grid), &FfmpegRunner::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedLayout(_)));
    }
}
