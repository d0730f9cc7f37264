//! Platform exports of a completed splice.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::encoding::EncodingConfig;
use crate::error::{ModelError, ModelResult};
use crate::id::{ExportId, SpliceId};
use crate::resolution::Resolution;

/// Days an export stays downloadable after completion
pub const DEFAULT_EXPORT_TTL_DAYS: i64 = 7;

/// Target social platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Tiktok,
    YoutubeShorts,
    InstagramReels,
    Generic,
}

/// Encoder settings for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub video_bitrate: Option<&'static str>,
    pub audio_bitrate: Option<&'static str>,
    pub crf: u8,
}

impl PlatformProfile {
    /// Composition-grade encoding config carrying this profile's rate control.
    pub fn encoding_config(&self) -> EncodingConfig {
        EncodingConfig::for_composition()
            .with_crf(self.crf)
            .with_bitrates(self.video_bitrate, self.audio_bitrate)
    }
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Tiktok,
        Platform::YoutubeShorts,
        Platform::InstagramReels,
        Platform::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::YoutubeShorts => "youtube_shorts",
            Platform::InstagramReels => "instagram_reels",
            Platform::Generic => "generic",
        }
    }

    pub fn profile(&self) -> PlatformProfile {
        match self {
            Platform::Tiktok => PlatformProfile {
                video_bitrate: Some("2M"),
                audio_bitrate: Some("128k"),
                crf: 23,
            },
            Platform::YoutubeShorts => PlatformProfile {
                video_bitrate: Some("3M"),
                audio_bitrate: Some("192k"),
                crf: 22,
            },
            Platform::InstagramReels => PlatformProfile {
                video_bitrate: Some("2.5M"),
                audio_bitrate: Some("128k"),
                crf: 23,
            },
            Platform::Generic => PlatformProfile {
                video_bitrate: None,
                audio_bitrate: None,
                crf: 23,
            },
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ModelError::unknown("platform", s))
    }
}

/// Export status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "pending",
            ExportStatus::Processing => "processing",
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Completed | ExportStatus::Failed)
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied export request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ExportOptions {
    #[serde(default)]
    pub platform: Platform,

    #[serde(default)]
    pub resolution: Resolution,

    #[validate(range(min = 24, max = 60))]
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Text burned into the bottom of the frame
    #[validate(length(min = 1, max = 200))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark_text: Option<String>,

    /// Free-form settings stored with the export
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

fn default_fps() -> u32 {
    30
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            resolution: Resolution::default(),
            fps: default_fps(),
            watermark_text: None,
            settings: BTreeMap::new(),
        }
    }
}

impl ExportOptions {
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            ..Default::default()
        }
    }

    pub fn with_watermark(mut self, text: impl Into<String>) -> Self {
        self.watermark_text = Some(text.into());
        self
    }
}

/// A platform-specific rendition of a splice.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Export {
    pub id: ExportId,
    pub splice_id: SpliceId,
    pub platform: Platform,
    pub resolution: Resolution,
    pub fps: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_text: Option<String>,

    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub status: ExportStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_duration: Option<f64>,
    /// Container bit rate in bits/second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bitrate: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Export {
    /// Create a pending export from validated options.
    pub fn new(splice_id: SpliceId, options: ExportOptions) -> ModelResult<Self> {
        options.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: ExportId::new(),
            splice_id,
            platform: options.platform,
            resolution: options.resolution,
            fps: options.fps,
            watermark_text: options.watermark_text,
            settings: options.settings,
            status: ExportStatus::Pending,
            output_path: None,
            output_size: None,
            output_duration: None,
            output_bitrate: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            expires_at: None,
        })
    }

    /// Record a finished rendition; expiry is `now + ttl`.
    pub fn complete(
        &mut self,
        output_path: impl Into<String>,
        size: u64,
        duration: f64,
        bitrate: u64,
        now: DateTime<Utc>,
        ttl: Duration,
    ) {
        self.status = ExportStatus::Completed;
        self.output_path = Some(output_path.into());
        self.output_size = Some(size);
        self.output_duration = Some(duration);
        self.output_bitrate = Some(bitrate);
        self.error_message = None;
        self.completed_at = Some(now);
        self.expires_at = Some(now + ttl);
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = ExportStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Whether the download window has closed. Exports without an expiry never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }
}
