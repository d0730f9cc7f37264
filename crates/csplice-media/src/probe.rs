//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub codec: String,
    /// Whether an audio stream is present
    pub has_audio: bool,
    /// File size in bytes
    pub size: u64,
    /// Bitrate in bits/second
    pub bitrate: u64,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Probe a media file.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    probe_video_with_timeout(path, None).await
}

/// Probe a media file, killing ffprobe if it runs longer than `timeout`.
pub async fn probe_video_with_timeout(
    path: impl AsRef<Path>,
    timeout: Option<Duration>,
) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, output).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("FFprobe timed out after {} seconds on {}", limit.as_secs(), path.display());
                return Err(MediaError::Timeout(limit.as_secs()));
            }
        },
        None => output.await?,
    };

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            format!("FFprobe exited with status {:?}", output.status.code()),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    parse_probe_output(&output.stdout)
}

/// Parse ffprobe's JSON report.
pub fn parse_probe_output(json: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    // Container duration first, then the video stream's own
    let duration = parse_number::<f64>(probe.format.duration.as_deref())
        .or_else(|| parse_number::<f64>(video_stream.duration.as_deref()))
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    let size = parse_number::<u64>(probe.format.size.as_deref()).unwrap_or(0);
    let bitrate = parse_number::<u64>(probe.format.bit_rate.as_deref()).unwrap_or(0);

    let fps = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(30.0);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
        has_audio,
        size,
        bitrate,
    })
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse::<T>().ok())
}

/// Parse frame rate string (e.g., "30/1" or "29.97"). Zero rates are rejected.
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den <= 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "r_frame_rate": "30000/1001", "avg_frame_rate": "30000/1001", "duration": "12.5"},
            {"codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"duration": "12.512000", "size": "1048576", "bit_rate": "670000"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
        assert!(parse_frame_rate("garbage").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let info = parse_probe_output(SAMPLE.as_bytes()).unwrap();
        assert!((info.duration - 12.512).abs() < 0.001);
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.fps - 29.97).abs() < 0.01);
        assert_eq!(info.codec, "h264");
        assert!(info.has_audio);
        assert_eq!(info.size, 1_048_576);
        assert_eq!(info.bitrate, 670_000);
    }

    #[test]
    fn test_falls_back_to_r_frame_rate() {
        let json = r#"{"streams": [{"codec_type": "video", "avg_frame_rate": "0/0",
            "r_frame_rate": "25/1"}], "format": {}}"#;
        let info = parse_probe_output(json.as_bytes()).unwrap();
        assert_eq!(info.fps, 25.0);
        assert!(!info.has_audio);
        assert_eq!(info.duration, 0.0);
    }

    #[test]
    fn test_rejects_audio_only() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        let err = parse_probe_output(json.as_bytes()).unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));
    }

    #[test]
    fn test_rejects_unparsable_output() {
        let err = parse_probe_output(b"not json").unwrap_err();
        assert!(matches!(err, MediaError::JsonParse(_)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = probe_video("/nonexistent/definitely/missing.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
