//! Clip records: time-bounded segments of a source video.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{ModelError, ModelResult};
use crate::id::{ClipId, VideoId};

/// A segment of a source video with optional AI scores.
///
/// Only [`Clip::new`] builds a clip, so `0 <= start < end <= video duration`
/// always holds and `duration` always equals `end - start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    pub id: ClipId,
    pub video_id: VideoId,

    /// Start time in seconds
    pub start_time: f64,
    /// End time in seconds
    pub end_time: f64,
    /// Duration in seconds
    pub duration: f64,

    /// Attention score (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attention_score: Option<f64>,
    /// Engagement score (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,
    /// Virality score (0.0-1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virality_score: Option<f64>,

    /// Keywords in the order the analysis returned them
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Named entities payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    pub created_at: DateTime<Utc>,
}

fn clamp_score(score: Option<f64>) -> Option<f64> {
    score.filter(|s| s.is_finite()).map(|s| s.clamp(0.0, 1.0))
}

impl Clip {
    /// Validate a time range against the owning video and build a clip.
    pub fn new(video_id: VideoId, video_duration: f64, start: f64, end: f64) -> ModelResult<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start >= end {
            return Err(ModelError::InvalidTimeRange { start, end });
        }
        if end > video_duration {
            return Err(ModelError::ExceedsVideoDuration {
                end,
                duration: video_duration,
            });
        }

        Ok(Self {
            id: ClipId::new(),
            video_id,
            start_time: start,
            end_time: end,
            duration: end - start,
            attention_score: None,
            engagement_score: None,
            virality_score: None,
            keywords: Vec::new(),
            entities: None,
            sentiment: None,
            caption: None,
            created_at: Utc::now(),
        })
    }

    /// Set scores, clamping each to 0.0-1.0.
    pub fn with_scores(
        mut self,
        attention: Option<f64>,
        engagement: Option<f64>,
        virality: Option<f64>,
    ) -> Self {
        self.attention_score = clamp_score(attention);
        self.engagement_score = clamp_score(engagement);
        self.virality_score = clamp_score(virality);
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_entities(mut self, entities: Option<serde_json::Value>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_sentiment(mut self, sentiment: Option<String>) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption;
        self
    }

    /// Number of distinct keywords (case-sensitive).
    pub fn distinct_keyword_count(&self) -> usize {
        self.keywords.iter().collect::<HashSet<_>>().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> VideoId {
        VideoId::from_string("v1")
    }

    #[test]
    fn test_duration_is_recomputed() {
        let clip = Clip::new(video(), 60.0, 10.0, 25.5).unwrap();
        assert_eq!(clip.duration, 15.5);
        assert_eq!(clip.start_time, 10.0);
        assert_eq!(clip.end_time, 25.5);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let err = Clip::new(video(), 60.0, 20.0, 10.0).unwrap_err();
        assert!(matches!(err, ModelError::InvalidTimeRange { .. }));
        assert!(Clip::new(video(), 60.0, 5.0, 5.0).is_err());
    }

    #[test]
    fn test_rejects_negative_start() {
        assert!(Clip::new(video(), 60.0, -1.0, 5.0).is_err());
    }

    #[test]
    fn test_rejects_end_past_video() {
        let err = Clip::new(video(), 30.0, 20.0, 31.0).unwrap_err();
        assert!(matches!(err, ModelError::ExceedsVideoDuration { .. }));
        assert!(Clip::new(video(), 30.0, 20.0, 30.0).is_ok());
    }

    #[test]
    fn test_rejects_nan() {
        assert!(Clip::new(video(), 30.0, f64::NAN, 10.0).is_err());
    }

    #[test]
    fn test_scores_are_clamped() {
        let clip = Clip::new(video(), 60.0, 0.0, 10.0)
            .unwrap()
            .with_scores(Some(1.7), Some(-0.2), None);
        assert_eq!(clip.attention_score, Some(1.0));
        assert_eq!(clip.engagement_score, Some(0.0));
        assert_eq!(clip.virality_score, None);
    }

    #[test]
    fn test_distinct_keywords() {
        let clip = Clip::new(video(), 60.0, 0.0, 10.0).unwrap().with_keywords(vec![
            "rust".into(),
            "async".into(),
            "rust".into(),
        ]);
        assert_eq!(clip.distinct_keyword_count(), 2);
        assert_eq!(clip.keywords.len(), 3);
    }
}
