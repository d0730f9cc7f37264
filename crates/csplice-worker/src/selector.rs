//! Clip selection for splices.
//!
//! The AI service picks clips when it is configured. When it is missing,
//! fails, returns an unusable answer, or the caller asks for it, clips are
//! ranked deterministically by a per-mode key instead.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use csplice_ai_client::{ClipDescriptor, SpliceRecommendation};
use csplice_models::{Clip, ClipId, SpliceMode};

use crate::backend::AnalysisBackend;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

/// How a selection was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Ai,
    Fallback,
}

/// Chosen clips in composition order.
#[derive(Debug, Clone)]
pub struct Selection {
    pub clips: Vec<Clip>,
    pub rationale: Option<String>,
    pub params: Option<Value>,
    pub source: SelectionSource,
}

impl Selection {
    pub fn clip_ids(&self) -> Vec<ClipId> {
        self.clips.iter().map(|c| c.id.clone()).collect()
    }
}

#[derive(Clone)]
pub struct ClipSelector {
    analysis: Option<Arc<dyn AnalysisBackend>>,
}

impl ClipSelector {
    pub fn new(analysis: Option<Arc<dyn AnalysisBackend>>) -> Self {
        Self { analysis }
    }

    /// Pick `num_clips` clips. Fails without selecting anything when fewer
    /// clips are available.
    pub async fn select(
        &self,
        clips: &[Clip],
        mode: SpliceMode,
        num_clips: usize,
        target_duration: u32,
        force_fallback: bool,
    ) -> WorkerResult<Selection> {
        if clips.len() < num_clips {
            return Err(WorkerError::validation(format!(
                "need {} clips, only {} available",
                num_clips,
                clips.len()
            )));
        }

        let analysis = match (&self.analysis, force_fallback) {
            (Some(analysis), false) => analysis,
            (None, _) => return Ok(fallback(clips, mode, num_clips, "unconfigured")),
            (_, true) => return Ok(fallback(clips, mode, num_clips, "requested")),
        };

        let descriptors: Vec<ClipDescriptor> = clips.iter().map(ClipDescriptor::from).collect();
        let recommendation = match analysis
            .recommend_selection(&descriptors, mode, target_duration, num_clips)
            .await
        {
            Ok(recommendation) => recommendation,
            Err(e) if e.is_external_api() => {
                warn!("AI selection failed, using {} ranking: {}", mode, e);
                return Ok(fallback(clips, mode, num_clips, "external_api"));
            }
            Err(e) => return Err(e.into()),
        };

        match resolve_recommendation(clips, &recommendation, num_clips) {
            Some(chosen) => {
                info!(mode = %mode, "AI selected {} clips", chosen.len());
                Ok(Selection {
                    clips: chosen,
                    rationale: recommendation.rationale,
                    params: recommendation.params,
                    source: SelectionSource::Ai,
                })
            }
            None => {
                warn!(
                    "AI recommendation unusable ({} ids for {} slots), using {} ranking",
                    recommendation.selected_clips.len(),
                    num_clips,
                    mode
                );
                Ok(fallback(clips, mode, num_clips, "unusable_recommendation"))
            }
        }
    }
}

/// Map recommended ids back to clips. `None` unless the ids are exactly
/// `num_clips` distinct known clips.
fn resolve_recommendation(
    clips: &[Clip],
    recommendation: &SpliceRecommendation,
    num_clips: usize,
) -> Option<Vec<Clip>> {
    if recommendation.selected_clips.len() != num_clips {
        return None;
    }
    let by_id: HashMap<&ClipId, &Clip> = clips.iter().map(|c| (&c.id, c)).collect();
    let mut seen = HashSet::new();
    recommendation
        .selected_clips
        .iter()
        .map(|id| {
            if !seen.insert(id) {
                return None;
            }
            by_id.get(id).map(|clip| (*clip).clone())
        })
        .collect()
}

fn fallback(clips: &[Clip], mode: SpliceMode, num_clips: usize, reason: &'static str) -> Selection {
    metrics::record_selection_fallback(mode.as_str(), reason);
    Selection {
        clips: rank_clips(clips, mode, num_clips),
        rationale: None,
        params: Some(json!({ "strategy": "fallback", "mode": mode, "reason": reason })),
        source: SelectionSource::Fallback,
    }
}

/// Ranking key for deterministic selection. Missing scores count as zero.
pub fn ranking_key(clip: &Clip, mode: SpliceMode) -> f64 {
    match mode {
        SpliceMode::Semantic => {
            clip.attention_score.unwrap_or(0.0) + clip.engagement_score.unwrap_or(0.0)
        }
        SpliceMode::Eclectic => clip.distinct_keyword_count() as f64,
        SpliceMode::Trending => clip.virality_score.unwrap_or(0.0),
    }
}

/// Top `num_clips` clips by descending key; ties keep input order.
pub fn rank_clips(clips: &[Clip], mode: SpliceMode, num_clips: usize) -> Vec<Clip> {
    let mut ranked: Vec<(f64, &Clip)> = clips.iter().map(|c| (ranking_key(c, mode), c)).collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    ranked
        .into_iter()
        .take(num_clips)
        .map(|(_, clip)| clip.clone())
        .collect()
}
