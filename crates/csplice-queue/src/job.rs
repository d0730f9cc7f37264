//! Job descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use csplice_models::{ExportId, JobId, SpliceId, VideoId};

/// Pipeline stage a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Analyze a source video and persist its clips
    Analysis,
    /// Render a splice
    SpliceRender,
    /// Re-encode a splice for a platform
    Export,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Analysis => "analysis",
            JobKind::SpliceRender => "splice_render",
            JobKind::Export => "export",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of background work: which stage, for which entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: JobId,
    pub kind: JobKind,
    pub entity_id: String,
    pub created_at: DateTime<Utc>,
}

impl JobDescriptor {
    fn new(kind: JobKind, entity_id: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            kind,
            entity_id: entity_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn analysis(video_id: &VideoId) -> Self {
        Self::new(JobKind::Analysis, video_id.as_str())
    }

    pub fn splice_render(splice_id: &SpliceId) -> Self {
        Self::new(JobKind::SpliceRender, splice_id.as_str())
    }

    pub fn export(export_id: &ExportId) -> Self {
        Self::new(JobKind::Export, export_id.as_str())
    }

    /// Key identifying the entity stage; at most one job per key runs at a time.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.kind, self.entity_id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
