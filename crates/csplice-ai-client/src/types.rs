//! Request and response types for the AI service.

use serde::{Deserialize, Serialize};

use csplice_models::{Clip, ClipId, Platform, SpliceMode};

/// Score sent for clips the analysis did not score.
pub const NEUTRAL_SCORE: f64 = 0.5;

pub(crate) mod task {
    pub const VIDEO_ANALYSIS: &str = "video_analysis";
    pub const CLIP_EXTRACTION: &str = "clip_extraction";
    pub const SPLICE_GENERATION: &str = "splice_generation";
    pub const CAPTION_GENERATION: &str = "caption_generation";
    pub const HASHTAG_GENERATION: &str = "hashtag_generation";
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalysisPayload<'a> {
    pub model: &'a str,
    pub task: &'static str,
    pub video_path: &'a str,
    pub include_attention_scores: bool,
    pub include_topics: bool,
    pub include_entities: bool,
    pub include_sentiment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_features: Option<&'a serde_json::Value>,
}

/// Clip extraction tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtractionParams {
    pub sensitivity: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    pub max_clips: u32,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            sensitivity: 0.75,
            min_duration: 3.0,
            max_duration: 30.0,
            max_clips: 50,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ClipExtractionPayload<'a> {
    pub model: &'a str,
    pub task: &'static str,
    pub video_path: &'a str,
    pub analysis_result: &'a serde_json::Value,
    #[serde(flatten)]
    pub params: ExtractionParams,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ClipExtractionResponse {
    #[serde(default)]
    pub clips: Vec<ClipCandidate>,
}

/// A clip proposed by the AI service. Nothing here is trusted: the time
/// range is validated against the source video before a [`Clip`] is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipCandidate {
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub attention_score: Option<f64>,
    #[serde(default)]
    pub engagement_score: Option<f64>,
    #[serde(default)]
    pub virality_score: Option<f64>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub entities: Option<serde_json::Value>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Clip summary sent with a selection request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipDescriptor {
    pub id: ClipId,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub attention_score: f64,
    pub engagement_score: f64,
    pub virality_score: f64,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
}

impl From<&Clip> for ClipDescriptor {
    /// Absent scores are sent as neutral.
    fn from(clip: &Clip) -> Self {
        Self {
            id: clip.id.clone(),
            start_time: clip.start_time,
            end_time: clip.end_time,
            duration: clip.duration,
            attention_score: clip.attention_score.unwrap_or(NEUTRAL_SCORE),
            engagement_score: clip.engagement_score.unwrap_or(NEUTRAL_SCORE),
            virality_score: clip.virality_score.unwrap_or(NEUTRAL_SCORE),
            keywords: clip.keywords.clone(),
            sentiment: clip.sentiment.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SplicePayload<'a> {
    pub model: &'a str,
    pub task: &'static str,
    pub clips: &'a [ClipDescriptor],
    pub mode: SpliceMode,
    pub target_duration: u32,
    pub num_clips: usize,
}

/// Selection returned by the AI service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SpliceRecommendation {
    /// Chosen clip ids in composition order
    #[serde(default)]
    pub selected_clips: Vec<ClipId>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CaptionPayload<'a> {
    pub model: &'a str,
    pub task: &'static str,
    pub metadata: &'a serde_json::Value,
    pub platform: Platform,
}

#[derive(Debug, Serialize)]
pub(crate) struct HashtagPayload<'a> {
    pub model: &'a str,
    pub task: &'static str,
    pub metadata: &'a serde_json::Value,
    pub platform: Platform,
    pub max_hashtags: u32,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CaptionResponse {
    #[serde(default)]
    pub caption: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HashtagResponse {
    #[serde(default)]
    pub hashtags: Vec<String>,
}
