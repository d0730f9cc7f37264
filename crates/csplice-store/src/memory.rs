//! In-memory [`RecordStore`].

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::fmt::Display;
use tokio::sync::RwLock;
use tracing::{debug, info};

use csplice_models::{
    Clip, ClipId, Export, ExportId, ExportStatus, SourceVideo, Splice, SpliceId, SpliceStatus,
    VideoId, VideoStatus,
};

use crate::error::{StoreError, StoreResult};
use crate::store::RecordStore;

#[derive(Debug, Default)]
struct Tables {
    videos: HashMap<VideoId, SourceVideo>,
    /// Clips keyed by id with their insertion sequence
    clips: HashMap<ClipId, (u64, Clip)>,
    splices: HashMap<SpliceId, Splice>,
    exports: HashMap<ExportId, Export>,
    next_seq: u64,
}

impl Tables {
    fn check_clip_refs(&self, splice: &Splice) -> StoreResult<()> {
        splice.validate_positions()?;
        for entry in &splice.clips {
            if !self.clips.contains_key(&entry.clip_id) {
                return Err(StoreError::integrity(format!(
                    "splice {} references missing clip {}",
                    splice.id, entry.clip_id
                )));
            }
        }
        Ok(())
    }
}

/// Record store backed by hash maps behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict(kind: &'static str, id: &str, current: impl Display, next: impl Display) -> StoreError {
    StoreError::StatusConflict {
        kind,
        id: id.to_string(),
        current: current.to_string(),
        next: next.to_string(),
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_video(&self, video: &SourceVideo) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.videos.contains_key(&video.id) {
            return Err(StoreError::AlreadyExists {
                kind: "video",
                id: video.id.to_string(),
            });
        }
        tables.videos.insert(video.id.clone(), video.clone());
        info!(video_id = %video.id, "Created video record");
        Ok(())
    }

    async fn get_video(&self, id: &VideoId) -> StoreResult<Option<SourceVideo>> {
        Ok(self.tables.read().await.videos.get(id).cloned())
    }

    async fn update_video(&self, video: &SourceVideo) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .videos
            .get_mut(&video.id)
            .ok_or_else(|| StoreError::not_found("video", video.id.as_str()))?;
        *slot = video.clone();
        Ok(())
    }

    async fn transition_video_status(
        &self,
        id: &VideoId,
        expected: &[VideoStatus],
        next: VideoStatus,
    ) -> StoreResult<SourceVideo> {
        let mut tables = self.tables.write().await;
        let video = tables
            .videos
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("video", id.as_str()))?;
        if !expected.contains(&video.status) {
            return Err(conflict("video", id.as_str(), video.status, next));
        }
        debug!(video_id = %id, from = %video.status, to = %next, "Video status transition");
        video.status = next;
        video.updated_at = Utc::now();
        Ok(video.clone())
    }

    async fn delete_video(&self, id: &VideoId) -> StoreResult<usize> {
        let mut tables = self.tables.write().await;
        if !tables.videos.contains_key(id) {
            return Err(StoreError::not_found("video", id.as_str()));
        }
        let referencing = tables.splices.values().find(|s| {
            s.clips.iter().any(|c| {
                tables
                    .clips
                    .get(&c.clip_id)
                    .is_some_and(|(_, clip)| &clip.video_id == id)
            })
        });
        if let Some(splice) = referencing {
            return Err(StoreError::integrity(format!(
                "video {} has clips referenced by splice {}",
                id, splice.id
            )));
        }
        tables.videos.remove(id);
        let before = tables.clips.len();
        tables.clips.retain(|_, (_, clip)| &clip.video_id != id);
        let removed = before - tables.clips.len();
        info!(video_id = %id, clips_removed = removed, "Deleted video record");
        Ok(removed)
    }

    async fn create_clips(&self, clips: &[Clip]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for clip in clips {
            if !tables.videos.contains_key(&clip.video_id) {
                return Err(StoreError::integrity(format!(
                    "clip {} belongs to missing video {}",
                    clip.id, clip.video_id
                )));
            }
            if tables.clips.contains_key(&clip.id) {
                return Err(StoreError::AlreadyExists {
                    kind: "clip",
                    id: clip.id.to_string(),
                });
            }
        }
        for clip in clips {
            let seq = tables.next_seq;
            tables.next_seq += 1;
            tables.clips.insert(clip.id.clone(), (seq, clip.clone()));
        }
        Ok(())
    }

    async fn get_clip(&self, id: &ClipId) -> StoreResult<Option<Clip>> {
        Ok(self
            .tables
            .read()
            .await
            .clips
            .get(id)
            .map(|(_, clip)| clip.clone()))
    }

    async fn list_clips_for_video(&self, video_id: &VideoId) -> StoreResult<Vec<Clip>> {
        let tables = self.tables.read().await;
        let mut clips: Vec<&(u64, Clip)> = tables
            .clips
            .values()
            .filter(|(_, clip)| &clip.video_id == video_id)
            .collect();
        clips.sort_by_key(|(seq, _)| *seq);
        Ok(clips.into_iter().map(|(_, clip)| clip.clone()).collect())
    }

    async fn delete_clip(&self, id: &ClipId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(splice) = tables
            .splices
            .values()
            .find(|s| s.clips.iter().any(|c| &c.clip_id == id))
        {
            return Err(StoreError::integrity(format!(
                "clip {} is referenced by splice {}",
                id, splice.id
            )));
        }
        tables
            .clips
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("clip", id.as_str()))
    }

    async fn create_splice(&self, splice: &Splice) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.splices.contains_key(&splice.id) {
            return Err(StoreError::AlreadyExists {
                kind: "splice",
                id: splice.id.to_string(),
            });
        }
        tables.check_clip_refs(splice)?;
        tables.splices.insert(splice.id.clone(), splice.clone());
        info!(splice_id = %splice.id, num_clips = splice.num_clips, "Created splice record");
        Ok(())
    }

    async fn get_splice(&self, id: &SpliceId) -> StoreResult<Option<Splice>> {
        Ok(self.tables.read().await.splices.get(id).cloned())
    }

    async fn update_splice(&self, splice: &Splice) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.splices.contains_key(&splice.id) {
            return Err(StoreError::not_found("splice", splice.id.as_str()));
        }
        tables.check_clip_refs(splice)?;
        tables.splices.insert(splice.id.clone(), splice.clone());
        Ok(())
    }

    async fn transition_splice_status(
        &self,
        id: &SpliceId,
        expected: &[SpliceStatus],
        next: SpliceStatus,
    ) -> StoreResult<Splice> {
        let mut tables = self.tables.write().await;
        let splice = tables
            .splices
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("splice", id.as_str()))?;
        if !expected.contains(&splice.status) {
            return Err(conflict("splice", id.as_str(), splice.status, next));
        }
        debug!(splice_id = %id, from = %splice.status, to = %next, "Splice status transition");
        splice.status = next;
        splice.updated_at = Utc::now();
        Ok(splice.clone())
    }

    async fn create_export(&self, export: &Export) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.splices.contains_key(&export.splice_id) {
            return Err(StoreError::integrity(format!(
                "export {} references missing splice {}",
                export.id, export.splice_id
            )));
        }
        if tables.exports.contains_key(&export.id) {
            return Err(StoreError::AlreadyExists {
                kind: "export",
                id: export.id.to_string(),
            });
        }
        tables.exports.insert(export.id.clone(), export.clone());
        info!(export_id = %export.id, splice_id = %export.splice_id, platform = %export.platform, "Created export record");
        Ok(())
    }

    async fn get_export(&self, id: &ExportId) -> StoreResult<Option<Export>> {
        Ok(self.tables.read().await.exports.get(id).cloned())
    }

    async fn update_export(&self, export: &Export) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .exports
            .get_mut(&export.id)
            .ok_or_else(|| StoreError::not_found("export", export.id.as_str()))?;
        *slot = export.clone();
        Ok(())
    }

    async fn transition_export_status(
        &self,
        id: &ExportId,
        expected: &[ExportStatus],
        next: ExportStatus,
    ) -> StoreResult<Export> {
        let mut tables = self.tables.write().await;
        let export = tables
            .exports
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("export", id.as_str()))?;
        if !expected.contains(&export.status) {
            return Err(conflict("export", id.as_str(), export.status, next));
        }
        debug!(export_id = %id, from = %export.status, to = %next, "Export status transition");
        export.status = next;
        export.updated_at = Utc::now();
        Ok(export.clone())
    }

    async fn list_exports_for_splice(&self, splice_id: &SpliceId) -> StoreResult<Vec<Export>> {
        let tables = self.tables.read().await;
        let mut exports: Vec<Export> = tables
            .exports
            .values()
            .filter(|e| &e.splice_id == splice_id)
            .cloned()
            .collect();
        exports.sort_by_key(|e| e.created_at);
        Ok(exports)
    }
}
