//! Splices: ordered multi-clip compositions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};
use crate::id::{ClipId, SpliceId, VideoId};

/// Shortest allowed splice target duration in seconds
pub const MIN_TARGET_DURATION: u32 = 15;
/// Longest allowed splice target duration in seconds
pub const MAX_TARGET_DURATION: u32 = 60;

/// Spatial arrangement of the composed streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Two streams stacked vertically, first on top
    #[default]
    SplitScreen,
    /// Two to four streams in a 2x2 grid, reading order
    Grid,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::SplitScreen => "split_screen",
            Layout::Grid => "grid",
        }
    }

    pub fn min_inputs(&self) -> usize {
        2
    }

    pub fn max_inputs(&self) -> usize {
        match self {
            Layout::SplitScreen => 2,
            Layout::Grid => 4,
        }
    }

    /// Check an input count against the layout.
    pub fn validate_clip_count(&self, count: usize) -> ModelResult<()> {
        if count < self.min_inputs() || count > self.max_inputs() {
            return Err(ModelError::invalid_field(format!(
                "layout {} takes {}..={} clips, got {}",
                self.as_str(),
                self.min_inputs(),
                self.max_inputs(),
                count
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "split_screen" => Ok(Layout::SplitScreen),
            "grid" => Ok(Layout::Grid),
            other => Err(ModelError::unknown("layout", other)),
        }
    }
}

/// Clip selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpliceMode {
    /// Thematic coherence: attention + engagement
    #[default]
    Semantic,
    /// Maximum variety: distinct keywords
    Eclectic,
    /// Trending potential: virality
    Trending,
}

impl SpliceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpliceMode::Semantic => "semantic",
            SpliceMode::Eclectic => "eclectic",
            SpliceMode::Trending => "trending",
        }
    }

    /// Capitalized name used in generated titles.
    pub fn title(&self) -> &'static str {
        match self {
            SpliceMode::Semantic => "Semantic",
            SpliceMode::Eclectic => "Eclectic",
            SpliceMode::Trending => "Trending",
        }
    }
}

impl fmt::Display for SpliceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpliceMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semantic" => Ok(SpliceMode::Semantic),
            "eclectic" => Ok(SpliceMode::Eclectic),
            "trending" => Ok(SpliceMode::Trending),
            other => Err(ModelError::unknown("splice mode", other)),
        }
    }
}

/// Splice render status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpliceStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SpliceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpliceStatus::Pending => "pending",
            SpliceStatus::Processing => "processing",
            SpliceStatus::Completed => "completed",
            SpliceStatus::Failed => "failed",
        }
    }

    /// A render may start from any state except while one is in flight.
    pub fn can_start_render(&self) -> bool {
        !matches!(self, SpliceStatus::Processing)
    }
}

impl fmt::Display for SpliceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clip reference with its position in the composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SpliceClip {
    pub clip_id: ClipId,
    pub position: usize,
}

/// An ordered multi-clip composition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Splice {
    pub id: SpliceId,
    pub title: String,
    pub layout: Layout,
    pub mode: SpliceMode,

    /// Target duration in seconds (15-60)
    pub target_duration: u32,

    pub num_clips: usize,

    /// Clip references; positions form a dense 0..num_clips permutation
    pub clips: Vec<SpliceClip>,

    /// Source videos the clips were gathered from
    #[serde(default)]
    pub source_video_ids: Vec<VideoId>,

    #[serde(default)]
    pub status: SpliceStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_duration: Option<f64>,

    /// Selection rationale from the AI service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_rationale: Option<String>,

    /// Selection parameters payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_params: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    #[serde(default)]
    pub hashtags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Splice {
    /// Build a pending splice. Positions follow the order of `clip_ids`.
    pub fn new(
        title: impl Into<String>,
        layout: Layout,
        mode: SpliceMode,
        target_duration: u32,
        clip_ids: Vec<ClipId>,
    ) -> ModelResult<Self> {
        if !(MIN_TARGET_DURATION..=MAX_TARGET_DURATION).contains(&target_duration) {
            return Err(ModelError::invalid_field(format!(
                "target_duration must be {}..={} seconds, got {}",
                MIN_TARGET_DURATION, MAX_TARGET_DURATION, target_duration
            )));
        }
        layout.validate_clip_count(clip_ids.len())?;

        let now = Utc::now();
        let splice = Self {
            id: SpliceId::new(),
            title: title.into(),
            layout,
            mode,
            target_duration,
            num_clips: clip_ids.len(),
            clips: clip_ids
                .into_iter()
                .enumerate()
                .map(|(position, clip_id)| SpliceClip { clip_id, position })
                .collect(),
            source_video_ids: Vec::new(),
            status: SpliceStatus::Pending,
            output_path: None,
            output_size: None,
            output_duration: None,
            ai_rationale: None,
            selection_params: None,
            caption: None,
            hashtags: Vec::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        splice.validate_positions()?;
        Ok(splice)
    }

    /// Check that the clip list matches `num_clips` and its positions are
    /// exactly `0..num_clips` with no duplicate clip.
    pub fn validate_positions(&self) -> ModelResult<()> {
        if self.clips.len() != self.num_clips {
            return Err(ModelError::invalid_positions(format!(
                "expected {} clips, found {}",
                self.num_clips,
                self.clips.len()
            )));
        }

        let mut seen = vec![false; self.num_clips];
        for entry in &self.clips {
            match seen.get_mut(entry.position) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(ModelError::invalid_positions(format!(
                        "position {} used twice",
                        entry.position
                    )))
                }
                None => {
                    return Err(ModelError::invalid_positions(format!(
                        "position {} out of range 0..{}",
                        entry.position, self.num_clips
                    )))
                }
            }
        }

        let mut ids: Vec<&ClipId> = self.clips.iter().map(|c| &c.clip_id).collect();
        ids.sort();
        ids.dedup();
        if ids.len() != self.clips.len() {
            return Err(ModelError::invalid_positions("duplicate clip reference"));
        }
        Ok(())
    }

    /// Clip ids sorted by position.
    pub fn ordered_clip_ids(&self) -> Vec<ClipId> {
        let mut entries: Vec<&SpliceClip> = self.clips.iter().collect();
        entries.sort_by_key(|c| c.position);
        entries.into_iter().map(|c| c.clip_id.clone()).collect()
    }

    /// Record a finished render.
    pub fn mark_completed(&mut self, output_path: impl Into<String>, size: u64, duration: f64) {
        let now = Utc::now();
        self.status = SpliceStatus::Completed;
        self.output_path = Some(output_path.into());
        self.output_size = Some(size);
        self.output_duration = Some(duration);
        self.error_message = None;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = SpliceStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<ClipId> {
        (0..n).map(|i| ClipId::from_string(format!("c{i}"))).collect()
    }

    #[test]
    fn test_layout_clip_counts() {
        assert!(Layout::SplitScreen.validate_clip_count(2).is_ok());
        assert!(Layout::SplitScreen.validate_clip_count(3).is_err());
        assert!(Layout::Grid.validate_clip_count(1).is_err());
        for n in 2..=4 {
            assert!(Layout::Grid.validate_clip_count(n).is_ok());
        }
        assert!(Layout::Grid.validate_clip_count(5).is_err());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Layout::SplitScreen).unwrap(), "\"split_screen\"");
        assert_eq!(serde_json::to_string(&SpliceMode::Trending).unwrap(), "\"trending\"");
        assert_eq!("eclectic".parse::<SpliceMode>().unwrap(), SpliceMode::Eclectic);
        assert!("diagonal".parse::<Layout>().is_err());
    }

    #[test]
    fn test_new_splice_assigns_positions() {
        let splice = Splice::new("t", Layout::Grid, SpliceMode::Semantic, 30, ids(3)).unwrap();
        assert_eq!(splice.status, SpliceStatus::Pending);
        assert_eq!(splice.num_clips, 3);
        let positions: Vec<usize> = splice.clips.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_target_duration_bounds() {
        assert!(Splice::new("t", Layout::SplitScreen, SpliceMode::Semantic, 14, ids(2)).is_err());
        assert!(Splice::new("t", Layout::SplitScreen, SpliceMode::Semantic, 61, ids(2)).is_err());
        assert!(Splice::new("t", Layout::SplitScreen, SpliceMode::Semantic, 60, ids(2)).is_ok());
    }

    #[test]
    fn test_positions_reject_gaps_and_duplicates() {
        let mut splice =
            Splice::new("t", Layout::Grid, SpliceMode::Semantic, 30, ids(3)).unwrap();
        let c = ids(3);
        assert!(splice.validate_positions().is_ok());

        splice.clips = vec![
            SpliceClip { clip_id: c[0].clone(), position: 0 },
            SpliceClip { clip_id: c[1].clone(), position: 1 },
            SpliceClip { clip_id: c[2].clone(), position: 3 },
        ];
        assert!(splice.validate_positions().is_err());

        splice.clips = vec![
            SpliceClip { clip_id: c[0].clone(), position: 0 },
            SpliceClip { clip_id: c[1].clone(), position: 0 },
            SpliceClip { clip_id: c[2].clone(), position: 2 },
        ];
        assert!(splice.validate_positions().is_err());
    }

    #[test]
    fn test_ordered_clip_ids_follow_position() {
        let mut splice =
            Splice::new("t", Layout::Grid, SpliceMode::Semantic, 30, ids(3)).unwrap();
        let c = ids(3);
        splice.clips = vec![
            SpliceClip { clip_id: c[0].clone(), position: 2 },
            SpliceClip { clip_id: c[1].clone(), position: 0 },
            SpliceClip { clip_id: c[2].clone(), position: 1 },
        ];
        splice.validate_positions().unwrap();
        assert_eq!(splice.ordered_clip_ids(), vec![c[1].clone(), c[2].clone(), c[0].clone()]);
    }

    #[test]
    fn test_render_start_states() {
        assert!(SpliceStatus::Pending.can_start_render());
        assert!(SpliceStatus::Completed.can_start_render());
        assert!(SpliceStatus::Failed.can_start_render());
        assert!(!SpliceStatus::Processing.can_start_render());
    }
}
