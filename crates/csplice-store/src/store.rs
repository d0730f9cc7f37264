//! The record store trait.

use async_trait::async_trait;

use csplice_models::{
    Clip, ClipId, Export, ExportId, ExportStatus, SourceVideo, Splice, SpliceId, SpliceStatus,
    VideoId, VideoStatus,
};

use crate::error::StoreResult;

/// Persistence for pipeline entities.
///
/// `update_*` replaces the whole record. `transition_*_status` atomically
/// moves a record to `next` only if its current status is one of
/// `expected`, returning the updated record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // Videos
    async fn create_video(&self, video: &SourceVideo) -> StoreResult<()>;
    async fn get_video(&self, id: &VideoId) -> StoreResult<Option<SourceVideo>>;
    async fn update_video(&self, video: &SourceVideo) -> StoreResult<()>;
    async fn transition_video_status(
        &self,
        id: &VideoId,
        expected: &[VideoStatus],
        next: VideoStatus,
    ) -> StoreResult<SourceVideo>;
    /// Delete a video and its clips. Fails with `Integrity` while a splice
    /// references any of those clips. Returns the number of clips removed.
    async fn delete_video(&self, id: &VideoId) -> StoreResult<usize>;

    // Clips
    /// Insert clips for one existing video.
    async fn create_clips(&self, clips: &[Clip]) -> StoreResult<()>;
    async fn get_clip(&self, id: &ClipId) -> StoreResult<Option<Clip>>;
    /// Clips of a video in insertion order.
    async fn list_clips_for_video(&self, video_id: &VideoId) -> StoreResult<Vec<Clip>>;
    /// Delete a clip no splice references.
    async fn delete_clip(&self, id: &ClipId) -> StoreResult<()>;

    // Splices
    async fn create_splice(&self, splice: &Splice) -> StoreResult<()>;
    async fn get_splice(&self, id: &SpliceId) -> StoreResult<Option<Splice>>;
    async fn update_splice(&self, splice: &Splice) -> StoreResult<()>;
    async fn transition_splice_status(
        &self,
        id: &SpliceId,
        expected: &[SpliceStatus],
        next: SpliceStatus,
    ) -> StoreResult<Splice>;

    // Exports
    async fn create_export(&self, export: &Export) -> StoreResult<()>;
    async fn get_export(&self, id: &ExportId) -> StoreResult<Option<Export>>;
    async fn update_export(&self, export: &Export) -> StoreResult<()>;
    async fn transition_export_status(
        &self,
        id: &ExportId,
        expected: &[ExportStatus],
        next: ExportStatus,
    ) -> StoreResult<Export>;
    async fn list_exports_for_splice(&self, splice_id: &SpliceId) -> StoreResult<Vec<Export>>;
}
