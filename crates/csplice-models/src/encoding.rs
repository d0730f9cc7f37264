//! Video encoding profiles.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Preset used when cutting clips out of a source video
pub const EXTRACTION_PRESET: &str = "fast";
/// Preset used for composition and platform exports
pub const COMPOSITION_PRESET: &str = "medium";
/// CRF used for clip extraction
pub const EXTRACTION_CRF: u8 = 23;
/// CRF used for composition
pub const COMPOSITION_CRF: u8 = 23;
/// Pixel format every stage encodes to
pub const PIXEL_FORMAT: &str = "yuv420p";
/// Width of generated thumbnails; height follows the aspect ratio
pub const THUMBNAIL_SCALE_WIDTH: u32 = 480;

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Target video bitrate (e.g., "2M"); encoder default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<String>,

    /// Target audio bitrate (e.g., "128k"); encoder default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    EXTRACTION_PRESET.to_string()
}
fn default_crf() -> u8 {
    EXTRACTION_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self::for_extraction()
    }
}

impl EncodingConfig {
    /// Fixed profile for clip extraction.
    ///
    /// Every extracted clip shares this profile so the compositor can stack
    /// them without per-input format negotiation.
    pub fn for_extraction() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: EXTRACTION_PRESET.to_string(),
            crf: EXTRACTION_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            video_bitrate: None,
            audio_bitrate: None,
        }
    }

    /// Profile for the single composition encode.
    pub fn for_composition() -> Self {
        Self {
            preset: COMPOSITION_PRESET.to_string(),
            crf: COMPOSITION_CRF,
            ..Self::for_extraction()
        }
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Returns a new config with explicit bitrates.
    pub fn with_bitrates(mut self, video: Option<&str>, audio: Option<&str>) -> Self {
        self.video_bitrate = video.map(str::to_string);
        self.audio_bitrate = audio.map(str::to_string);
        self
    }
}
