//! Source video records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::VideoId;

/// Source video processing status.
///
/// `Uploaded -> Analyzing -> {Analyzed, Failed}`. Both end states are
/// terminal; a fresh ingestion is needed to analyze again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Ingested and probed, waiting for analysis
    #[default]
    Uploaded,
    /// AI analysis in flight
    Analyzing,
    /// Clips detected and persisted
    Analyzed,
    /// Analysis failed
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Analyzing => "analyzing",
            VideoStatus::Analyzed => "analyzed",
            VideoStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Analyzed | VideoStatus::Failed)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ingested media file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourceVideo {
    pub id: VideoId,

    /// Human-readable title
    pub title: String,

    /// Location of the media file on disk
    pub file_path: String,

    /// File size in bytes
    #[serde(default)]
    pub file_size: u64,

    /// Duration in seconds
    pub duration: f64,

    pub width: u32,
    pub height: u32,

    /// Frame rate (fps)
    pub fps: f64,

    /// Video codec name
    pub codec: String,

    /// Whether the file carries an audio stream
    #[serde(default)]
    pub has_audio: bool,

    /// Container bit rate in bits/second
    #[serde(default)]
    pub bitrate: u64,

    #[serde(default)]
    pub status: VideoStatus,

    /// Opaque analysis payload returned by the AI service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// Audio analysis section of the AI payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_analysis: Option<serde_json::Value>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Poster frame written at ingest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl SourceVideo {
    /// Create a freshly ingested video in the `Uploaded` state.
    pub fn new(title: impl Into<String>, file_path: impl Into<String>, duration: f64) -> Self {
        let now = Utc::now();
        Self {
            id: VideoId::new(),
            title: title.into(),
            file_path: file_path.into(),
            file_size: 0,
            duration: duration.max(0.0),
            width: 0,
            height: 0,
            fps: 0.0,
            codec: String::new(),
            has_audio: false,
            bitrate: 0,
            status: VideoStatus::Uploaded,
            analysis_result: None,
            transcript: None,
            audio_analysis: None,
            error_message: None,
            thumbnail_path: None,
            created_at: now,
            updated_at: now,
            analyzed_at: None,
        }
    }

    /// Attach the analysis payload and mark as analyzed.
    ///
    /// The transcript and audio analysis are lifted out of the payload when
    /// the service includes them.
    pub fn mark_analyzed(&mut self, analysis: serde_json::Value) {
        self.transcript = analysis
            .get("transcript")
            .and_then(|t| t.as_str())
            .map(str::to_string);
        self.audio_analysis = analysis.get("audio_analysis").cloned();
        self.analysis_result = Some(analysis);
        self.status = VideoStatus::Analyzed;
        self.error_message = None;
        self.analyzed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark as failed.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = VideoStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }
}
