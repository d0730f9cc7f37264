//! Pipeline orchestration: ingestion, analysis, splice rendering and exports.
//!
//! Triggers validate and enqueue a [`JobDescriptor`]; the executor later calls
//! [`Orchestrator::execute`], which claims the entity with a check-and-set
//! status transition before running the stage. Stage failures are written
//! back to the entity as FAILED with the error text.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use csplice_ai_client::ClipCandidate;
use csplice_media::fs_utils::{ensure_dir, file_size, remove_file_best_effort, remove_files_best_effort};
use csplice_media::{ClipExtraction, Composition, Optimization, Thumbnail};
use csplice_models::{
    splice::{MAX_TARGET_DURATION, MIN_TARGET_DURATION},
    Clip, Export, ExportId, ExportOptions, ExportStatus, JobId, Layout, ModelResult, SourceVideo,
    Splice, SpliceId, SpliceMode, SpliceStatus, VideoId, VideoStatus,
};
use csplice_queue::{JobDescriptor, JobKind, JobQueue};
use csplice_store::{RecordStore, StoreError};

use crate::backend::{AnalysisBackend, MediaBackend};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::selector::ClipSelector;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of running a queued stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// The entity was not in a startable status; nothing ran.
    Skipped { current: String },
}

/// Parameters for building a splice from analyzed videos.
#[derive(Debug, Clone)]
pub struct SpliceRequest {
    pub video_ids: Vec<VideoId>,
    pub layout: Layout,
    pub mode: SpliceMode,
    pub num_clips: usize,
    pub target_duration: u32,
    /// Skip the AI service and rank clips deterministically.
    pub force_fallback: bool,
}

impl SpliceRequest {
    pub fn new(video_ids: Vec<VideoId>, layout: Layout, mode: SpliceMode, num_clips: usize) -> Self {
        Self {
            video_ids,
            layout,
            mode,
            num_clips,
            target_duration: 30,
            force_fallback: false,
        }
    }

    pub fn with_target_duration(mut self, seconds: u32) -> Self {
        self.target_duration = seconds;
        self
    }

    pub fn with_fallback(mut self) -> Self {
        self.force_fallback = true;
        self
    }
}

pub struct Orchestrator {
    store: Arc<dyn RecordStore>,
    media: Arc<dyn MediaBackend>,
    analysis: Option<Arc<dyn AnalysisBackend>>,
    selector: ClipSelector,
    queue: JobQueue,
    config: WorkerConfig,
    ffmpeg_slots: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        media: Arc<dyn MediaBackend>,
        analysis: Option<Arc<dyn AnalysisBackend>>,
        queue: JobQueue,
        config: WorkerConfig,
    ) -> Self {
        Self {
            selector: ClipSelector::new(analysis.clone()),
            ffmpeg_slots: Arc::new(Semaphore::new(config.max_ffmpeg_processes.max(1))),
            store,
            media,
            analysis,
            queue,
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    // ---------------------------------------------------------------
    // Ingestion
    // ---------------------------------------------------------------

    /// Probe a source file and record it as UPLOADED.
    pub async fn ingest_video(&self, path: &Path, title: Option<&str>) -> WorkerResult<SourceVideo> {
        if !path.is_file() {
            return Err(WorkerError::validation(format!(
                "source file not found: {}",
                path.display()
            )));
        }

        let info = self.media.probe(path).await?;
        let title = title.map(str::to_string).unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "untitled".to_string())
        });

        let mut video = SourceVideo::new(title, path.to_string_lossy(), info.duration);
        video.file_size = info.size;
        video.width = info.width;
        video.height = info.height;
        video.fps = info.fps;
        video.codec = info.codec;
        video.has_audio = info.has_audio;
        video.bitrate = info.bitrate;
        video.thumbnail_path = self.write_thumbnail(&video, path).await;

        self.store.create_video(&video).await?;
        info!(
            video_id = %video.id,
            duration = video.duration,
            "Ingested {}x{} video", video.width, video.height
        );
        Ok(video)
    }

    /// Grab the middle frame as a poster. Failures are logged and leave the
    /// video without a thumbnail.
    async fn write_thumbnail(&self, video: &SourceVideo, source: &Path) -> Option<String> {
        let output = self
            .config
            .thumbnail_dir
            .join(format!("{}.jpg", video.id));
        let request = Thumbnail::new(source, &output).at(video.duration / 2.0);

        let result = match ensure_dir(&self.config.thumbnail_dir).await {
            Ok(()) => self.media.thumbnail(&request).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Some(output.to_string_lossy().into_owned()),
            Err(e) => {
                warn!(video_id = %video.id, "Thumbnail generation failed: {}", e);
                remove_file_best_effort(&output).await;
                None
            }
        }
    }

    // ---------------------------------------------------------------
    // Triggers
    // ---------------------------------------------------------------

    /// Queue analysis of an UPLOADED video.
    pub async fn trigger_analysis(&self, video_id: &VideoId) -> WorkerResult<JobId> {
        let video = self.require_video(video_id).await?;
        if video.status != VideoStatus::Uploaded {
            return Err(WorkerError::validation(format!(
                "video {} is {}, only uploaded videos can be analyzed",
                video_id, video.status
            )));
        }
        self.enqueue(JobDescriptor::analysis(video_id)).await
    }

    /// Queue a render. Allowed from PENDING, COMPLETED or FAILED.
    pub async fn trigger_splice_render(&self, splice_id: &SpliceId) -> WorkerResult<JobId> {
        let splice = self.require_splice(splice_id).await?;
        if !splice.status.can_start_render() {
            return Err(WorkerError::validation(format!(
                "splice {} is already {}",
                splice_id,
                splice.status.as_str()
            )));
        }
        self.ensure_no_active_exports(splice_id).await?;
        self.enqueue(JobDescriptor::splice_render(splice_id)).await
    }

    /// Queue processing of a PENDING export.
    pub async fn trigger_export(&self, export_id: &ExportId) -> WorkerResult<JobId> {
        let export = self.require_export(export_id).await?;
        if export.status != ExportStatus::Pending {
            return Err(WorkerError::validation(format!(
                "export {} is {}",
                export_id,
                export.status.as_str()
            )));
        }
        self.enqueue(JobDescriptor::export(export_id)).await
    }

    /// Create an export and queue it.
    pub async fn request_export(
        &self,
        splice_id: &SpliceId,
        options: ExportOptions,
    ) -> WorkerResult<Export> {
        let export = self.create_export(splice_id, options).await?;
        self.trigger_export(&export.id).await?;
        Ok(export)
    }

    async fn enqueue(&self, job: JobDescriptor) -> WorkerResult<JobId> {
        let job_id = job.job_id.clone();
        debug!(job_id = %job_id, key = %job.idempotency_key(), "Enqueueing job");
        self.queue.enqueue(job).await?;
        Ok(job_id)
    }

    // ---------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------

    /// Select clips from analyzed videos and record a PENDING splice.
    pub async fn create_splice(&self, request: SpliceRequest) -> WorkerResult<Splice> {
        request.layout.validate_clip_count(request.num_clips)?;
        if !(MIN_TARGET_DURATION..=MAX_TARGET_DURATION).contains(&request.target_duration) {
            return Err(WorkerError::validation(format!(
                "target_duration must be {}..={} seconds, got {}",
                MIN_TARGET_DURATION, MAX_TARGET_DURATION, request.target_duration
            )));
        }
        if request.video_ids.is_empty() {
            return Err(WorkerError::validation("at least one source video is required"));
        }

        let mut video_ids: Vec<VideoId> = Vec::with_capacity(request.video_ids.len());
        for id in request.video_ids {
            if !video_ids.contains(&id) {
                video_ids.push(id);
            }
        }

        let mut clips = Vec::new();
        for video_id in &video_ids {
            let video = self.require_video(video_id).await?;
            if video.status != VideoStatus::Analyzed {
                return Err(WorkerError::validation(format!(
                    "video {} is {}, only analyzed videos can be spliced",
                    video_id, video.status
                )));
            }
            clips.extend(self.store.list_clips_for_video(video_id).await?);
        }

        let selection = self
            .selector
            .select(
                &clips,
                request.mode,
                request.num_clips,
                request.target_duration,
                request.force_fallback,
            )
            .await?;

        let title = format!("{} Splice - {}", request.mode.title(), Utc::now().format("%Y%m%d"));
        let mut splice = Splice::new(
            title,
            request.layout,
            request.mode,
            request.target_duration,
            selection.clip_ids(),
        )?;
        splice.source_video_ids = video_ids;
        splice.ai_rationale = selection.rationale;
        splice.selection_params = selection.params;

        self.store.create_splice(&splice).await?;
        info!(
            splice_id = %splice.id,
            layout = %splice.layout,
            mode = %splice.mode,
            "Created splice with {} clips", splice.num_clips
        );
        Ok(splice)
    }

    /// Validate the splice and record a PENDING export.
    pub async fn create_export(
        &self,
        splice_id: &SpliceId,
        options: ExportOptions,
    ) -> WorkerResult<Export> {
        let splice = self.require_splice(splice_id).await?;
        if splice.status != SpliceStatus::Completed {
            return Err(WorkerError::validation(format!(
                "splice {} is {}, only completed splices can be exported",
                splice_id,
                splice.status.as_str()
            )));
        }
        let artifact_exists = splice
            .output_path
            .as_deref()
            .is_some_and(|p| Path::new(p).is_file());
        if !artifact_exists {
            return Err(WorkerError::validation(format!(
                "splice {} has no rendered output",
                splice_id
            )));
        }

        let export = Export::new(splice_id.clone(), options)?;
        self.store.create_export(&export).await?;
        info!(
            export_id = %export.id,
            splice_id = %splice_id,
            platform = %export.platform,
            "Created export"
        );
        Ok(export)
    }

    /// Output location of a completed, unexpired export.
    pub async fn export_download(&self, export_id: &ExportId, now: DateTime<Utc>) -> WorkerResult<PathBuf> {
        let export = self.require_export(export_id).await?;
        if export.status != ExportStatus::Completed {
            return Err(WorkerError::validation(format!(
                "export {} is {}",
                export_id,
                export.status.as_str()
            )));
        }
        if export.is_expired(now) {
            return Err(WorkerError::validation(format!("export {} has expired", export_id)));
        }
        export
            .output_path
            .map(PathBuf::from)
            .ok_or_else(|| WorkerError::validation(format!("export {} has no output", export_id)))
    }

    // ---------------------------------------------------------------
    // Stages
    // ---------------------------------------------------------------

    /// Run the stage a queued job names.
    pub async fn execute(&self, job: &JobDescriptor) -> WorkerResult<StageOutcome> {
        match job.kind {
            JobKind::Analysis => {
                self.run_analysis(&VideoId::from_string(job.entity_id.clone())).await
            }
            JobKind::SpliceRender => {
                self.run_splice_render(&SpliceId::from_string(job.entity_id.clone())).await
            }
            JobKind::Export => self.run_export(&ExportId::from_string(job.entity_id.clone())).await,
        }
    }

    /// UPLOADED → ANALYZING → {ANALYZED, FAILED}.
    pub async fn run_analysis(&self, video_id: &VideoId) -> WorkerResult<StageOutcome> {
        let video = match self
            .store
            .transition_video_status(video_id, &[VideoStatus::Uploaded], VideoStatus::Analyzing)
            .await
        {
            Ok(video) => video,
            Err(StoreError::StatusConflict { current, .. }) => {
                return Ok(StageOutcome::Skipped { current })
            }
            Err(e) => return Err(e.into()),
        };

        info!(video_id = %video_id, "Analysis started");
        match self.analyze_video(video).await {
            Ok(clip_count) => {
                info!(video_id = %video_id, clips = clip_count, "Analysis completed");
                Ok(StageOutcome::Completed)
            }
            Err(e) => {
                self.fail_video(video_id, &e).await;
                Err(e)
            }
        }
    }

    async fn analyze_video(&self, mut video: SourceVideo) -> WorkerResult<usize> {
        let analysis = self
            .analysis
            .as_ref()
            .ok_or_else(|| WorkerError::external_api("AI analysis service is not configured"))?;

        let payload = analysis.analyze(&video.file_path, video.transcript.clone()).await?;
        let candidates = analysis
            .extract_clips(&video.file_path, &payload, self.config.extraction)
            .await?;

        let total = candidates.len();
        let clips: Vec<Clip> = candidates
            .into_iter()
            .enumerate()
            .filter_map(|(index, candidate)| match clip_from_candidate(&video, candidate) {
                Ok(clip) => Some(clip),
                Err(e) => {
                    warn!(video_id = %video.id, "Skipping clip candidate {}: {}", index, e);
                    None
                }
            })
            .collect();
        if clips.len() < total {
            warn!(
                video_id = %video.id,
                "Kept {} of {} clip candidates", clips.len(), total
            );
        }

        if !clips.is_empty() {
            self.store.create_clips(&clips).await?;
        }
        video.mark_analyzed(payload);
        if let Err(e) = self.store.update_video(&video).await {
            for clip in &clips {
                if let Err(cleanup) = self.store.delete_clip(&clip.id).await {
                    warn!(clip_id = %clip.id, "Failed to remove clip of unfinished analysis: {}", cleanup);
                }
            }
            return Err(e.into());
        }
        Ok(clips.len())
    }

    /// {PENDING, COMPLETED, FAILED} → PROCESSING → {COMPLETED, FAILED}.
    pub async fn run_splice_render(&self, splice_id: &SpliceId) -> WorkerResult<StageOutcome> {
        // The artifact is rewritten in place; exports still reading it must finish first.
        self.ensure_no_active_exports(splice_id).await?;
        let splice = match self
            .store
            .transition_splice_status(
                splice_id,
                &[SpliceStatus::Pending, SpliceStatus::Completed, SpliceStatus::Failed],
                SpliceStatus::Processing,
            )
            .await
        {
            Ok(splice) => splice,
            Err(StoreError::StatusConflict { current, .. }) => {
                return Ok(StageOutcome::Skipped { current })
            }
            Err(e) => return Err(e.into()),
        };

        info!(splice_id = %splice_id, layout = %splice.layout, "Render started");
        match self.render_splice(splice).await {
            Ok(()) => Ok(StageOutcome::Completed),
            Err(e) => {
                remove_file_best_effort(self.splice_output_path(splice_id)).await;
                self.fail_splice(splice_id, &e).await;
                Err(e)
            }
        }
    }

    async fn render_splice(&self, mut splice: Splice) -> WorkerResult<()> {
        let mut sources = Vec::with_capacity(splice.num_clips);
        for clip_id in splice.ordered_clip_ids() {
            let clip = self
                .store
                .get_clip(&clip_id)
                .await?
                .ok_or_else(|| WorkerError::processing(format!("clip {} not found", clip_id)))?;
            let video = self.store.get_video(&clip.video_id).await?.ok_or_else(|| {
                WorkerError::processing(format!("source video {} not found", clip.video_id))
            })?;
            sources.push((clip, video));
        }

        ensure_dir(&self.config.scratch_dir).await?;
        ensure_dir(&self.config.export_dir).await?;

        let temp_paths: Vec<PathBuf> = sources
            .iter()
            .map(|_| {
                self.config
                    .scratch_dir
                    .join(format!("clip_{}_{}.mp4", splice.id, Uuid::new_v4().simple()))
            })
            .collect();
        let output = self.splice_output_path(&splice.id);

        let composed = self
            .extract_and_compose(&splice, &sources, &temp_paths, &output)
            .await;
        let leftover = remove_files_best_effort(&temp_paths).await;
        if leftover > 0 {
            warn!(splice_id = %splice.id, "{} temp clips could not be removed", leftover);
        }
        composed?;

        let info = self.media.probe(&output).await?;
        let size = file_size(&output).await?;

        let clips: Vec<Clip> = sources.into_iter().map(|(clip, _)| clip).collect();
        let metadata = splice_metadata(&splice, &clips);
        let (caption, hashtags) = self.describe(&metadata).await;

        splice.mark_completed(output.to_string_lossy(), size, info.duration);
        splice.caption = (!caption.is_empty()).then_some(caption);
        splice.hashtags = hashtags;
        self.store.update_splice(&splice).await?;

        info!(
            splice_id = %splice.id,
            duration = info.duration,
            size = size,
            "Render completed"
        );
        Ok(())
    }

    async fn extract_and_compose(
        &self,
        splice: &Splice,
        sources: &[(Clip, SourceVideo)],
        temp_paths: &[PathBuf],
        output: &Path,
    ) -> WorkerResult<()> {
        let extractions = sources.iter().zip(temp_paths).map(|((clip, video), temp)| {
            let mut request =
                ClipExtraction::new(&video.file_path, temp, clip.start_time, clip.end_time);
            if !video.has_audio {
                request = request.without_audio();
            }
            async move {
                let _permit = self
                    .ffmpeg_slots
                    .acquire()
                    .await
                    .map_err(|_| WorkerError::processing("ffmpeg slots closed"))?;
                debug!(clip_id = %clip.id, "Extracting {:.2}s", request.duration());
                self.media.extract_clip(&request).await?;
                Ok::<(), WorkerError>(())
            }
        });
        for result in join_all(extractions).await {
            result?;
        }

        let composition = Composition {
            inputs: temp_paths.to_vec(),
            output: output.to_path_buf(),
            layout: splice.layout,
            resolution: self.config.splice_resolution,
            fps: self.config.splice_fps,
        };
        let _permit = self
            .ffmpeg_slots
            .acquire()
            .await
            .map_err(|_| WorkerError::processing("ffmpeg slots closed"))?;
        self.media.compose(&composition).await?;
        Ok(())
    }

    /// Caption and hashtags; empty when the AI service is missing or fails.
    async fn describe(&self, metadata: &Value) -> (String, Vec<String>) {
        match &self.analysis {
            Some(analysis) => {
                let platform = self.config.caption_platform;
                let caption = analysis.generate_caption(metadata, platform).await;
                let hashtags = analysis.generate_hashtags(metadata, platform).await;
                (caption, hashtags)
            }
            None => (String::new(), Vec::new()),
        }
    }

    /// PENDING → PROCESSING → {COMPLETED, FAILED}.
    pub async fn run_export(&self, export_id: &ExportId) -> WorkerResult<StageOutcome> {
        let export = match self
            .store
            .transition_export_status(export_id, &[ExportStatus::Pending], ExportStatus::Processing)
            .await
        {
            Ok(export) => export,
            Err(StoreError::StatusConflict { current, .. }) => {
                return Ok(StageOutcome::Skipped { current })
            }
            Err(e) => return Err(e.into()),
        };

        info!(export_id = %export_id, platform = %export.platform, "Export started");
        let output = self.export_output_path(&export);
        match self.process_export(export, &output).await {
            Ok(()) => Ok(StageOutcome::Completed),
            Err(e) => {
                remove_file_best_effort(&output).await;
                self.fail_export(export_id, &e).await;
                Err(e)
            }
        }
    }

    async fn process_export(&self, mut export: Export, output: &Path) -> WorkerResult<()> {
        let splice = self.store.get_splice(&export.splice_id).await?.ok_or_else(|| {
            WorkerError::processing(format!("splice {} not found", export.splice_id))
        })?;
        let input = splice.output_path.ok_or_else(|| {
            WorkerError::processing(format!("splice {} has no rendered output", splice.id))
        })?;

        ensure_dir(&self.config.export_dir).await?;
        let request = Optimization {
            input: PathBuf::from(input),
            output: output.to_path_buf(),
            platform: export.platform,
            resolution: export.resolution,
            fps: export.fps,
            watermark_text: export.watermark_text.clone(),
        };
        {
            let _permit = self
                .ffmpeg_slots
                .acquire()
                .await
                .map_err(|_| WorkerError::processing("ffmpeg slots closed"))?;
            self.media.optimize(&request).await?;
        }

        let info = self.media.probe(output).await?;
        let size = file_size(output).await?;
        export.complete(
            output.to_string_lossy(),
            size,
            info.duration,
            info.bitrate,
            Utc::now(),
            self.config.export_ttl(),
        );
        self.store.update_export(&export).await?;

        info!(
            export_id = %export.id,
            size = size,
            bitrate = info.bitrate,
            "Export completed"
        );
        Ok(())
    }

    // ---------------------------------------------------------------
    // Waiting on outcomes
    // ---------------------------------------------------------------

    /// Poll until the video is ANALYZED or FAILED.
    pub async fn wait_for_video(&self, id: &VideoId, timeout: Duration) -> WorkerResult<SourceVideo> {
        self.poll_until(timeout, move || async move {
            let video = self.require_video(id).await?;
            Ok(video.status.is_terminal().then_some(video))
        })
        .await
    }

    /// Poll until the splice is COMPLETED or FAILED.
    pub async fn wait_for_splice(&self, id: &SpliceId, timeout: Duration) -> WorkerResult<Splice> {
        self.poll_until(timeout, move || async move {
            let splice = self.require_splice(id).await?;
            let done = matches!(splice.status, SpliceStatus::Completed | SpliceStatus::Failed);
            Ok(done.then_some(splice))
        })
        .await
    }

    /// Poll until the export is COMPLETED or FAILED.
    pub async fn wait_for_export(&self, id: &ExportId, timeout: Duration) -> WorkerResult<Export> {
        self.poll_until(timeout, move || async move {
            let export = self.require_export(id).await?;
            Ok(export.status.is_terminal().then_some(export))
        })
        .await
    }

    async fn poll_until<T, F, Fut>(&self, timeout: Duration, mut check: F) -> WorkerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = WorkerResult<Option<T>>>,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(value) = check().await? {
                return Ok(value);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(WorkerError::processing(format!(
                    "timed out after {:?} waiting for a terminal status",
                    timeout
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    fn splice_output_path(&self, id: &SpliceId) -> PathBuf {
        self.config.export_dir.join(format!("splice_{}.mp4", id))
    }

    fn export_output_path(&self, export: &Export) -> PathBuf {
        self.config
            .export_dir
            .join(format!("export_{}_{}.mp4", export.id, export.platform))
    }

    async fn ensure_no_active_exports(&self, splice_id: &SpliceId) -> WorkerResult<()> {
        let active = self
            .store
            .list_exports_for_splice(splice_id)
            .await?
            .into_iter()
            .filter(|e| !e.status.is_terminal())
            .count();
        if active > 0 {
            return Err(WorkerError::validation(format!(
                "splice {} has {} export(s) in progress",
                splice_id, active
            )));
        }
        Ok(())
    }

    async fn require_video(&self, id: &VideoId) -> WorkerResult<SourceVideo> {
        self.store
            .get_video(id)
            .await?
            .ok_or_else(|| WorkerError::validation(format!("video {} not found", id)))
    }

    async fn require_splice(&self, id: &SpliceId) -> WorkerResult<Splice> {
        self.store
            .get_splice(id)
            .await?
            .ok_or_else(|| WorkerError::validation(format!("splice {} not found", id)))
    }

    async fn require_export(&self, id: &ExportId) -> WorkerResult<Export> {
        self.store
            .get_export(id)
            .await?
            .ok_or_else(|| WorkerError::validation(format!("export {} not found", id)))
    }

    async fn fail_video(&self, id: &VideoId, err: &WorkerError) {
        error!(video_id = %id, "Analysis failed: {}", err);
        let result = match self.store.get_video(id).await {
            Ok(Some(mut video)) => {
                video.mark_failed(err.to_string());
                self.store.update_video(&video).await
            }
            Ok(None) => return,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(video_id = %id, "Failed to record analysis failure: {}", e);
        }
    }

    async fn fail_splice(&self, id: &SpliceId, err: &WorkerError) {
        error!(splice_id = %id, "Render failed: {}", err);
        let result = match self.store.get_splice(id).await {
            Ok(Some(mut splice)) => {
                splice.mark_failed(err.to_string());
                self.store.update_splice(&splice).await
            }
            Ok(None) => return,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(splice_id = %id, "Failed to record render failure: {}", e);
        }
    }

    async fn fail_export(&self, id: &ExportId, err: &WorkerError) {
        error!(export_id = %id, "Export failed: {}", err);
        let result = match self.store.get_export(id).await {
            Ok(Some(mut export)) => {
                export.mark_failed(err.to_string());
                self.store.update_export(&export).await
            }
            Ok(None) => return,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(export_id = %id, "Failed to record export failure: {}", e);
        }
    }
}

/// Build a clip from an AI candidate, validating its range against the video.
fn clip_from_candidate(video: &SourceVideo, candidate: ClipCandidate) -> ModelResult<Clip> {
    let (start, end) = match (candidate.start_time, candidate.end_time) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(csplice_models::ModelError::invalid_field(
                "candidate is missing start_time or end_time",
            ))
        }
    };

    Ok(Clip::new(video.id.clone(), video.duration, start, end)?
        .with_scores(
            candidate.attention_score,
            candidate.engagement_score,
            candidate.virality_score,
        )
        .with_keywords(candidate.keywords)
        .with_entities(candidate.entities)
        .with_sentiment(candidate.sentiment)
        .with_caption(candidate.caption))
}

/// Metadata sent for caption and hashtag generation.
fn splice_metadata(splice: &Splice, clips: &[Clip]) -> Value {
    let mut keywords: Vec<&str> = Vec::new();
    for keyword in clips.iter().flat_map(|c| c.keywords.iter()) {
        if !keywords.contains(&keyword.as_str()) {
            keywords.push(keyword);
        }
    }
    json!({
        "title": splice.title,
        "mode": splice.mode,
        "layout": splice.layout,
        "num_clips": splice.num_clips,
        "keywords": keywords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(duration: f64) -> SourceVideo {
        SourceVideo::new("talk", "/videos/talk.mp4", duration)
    }

    #[test]
    fn test_candidate_inside_video_becomes_clip() {
        let candidate = ClipCandidate {
            start_time: Some(10.0),
            end_time: Some(18.5),
            virality_score: Some(1.4),
            keywords: vec!["rust".into()],
            ..Default::default()
        };
        let clip = clip_from_candidate(&video(60.0), candidate).unwrap();
        assert_eq!(clip.duration, 8.5);
        assert_eq!(clip.virality_score, Some(1.0));
        assert_eq!(clip.keywords, vec!["rust".to_string()]);
    }

    #[test]
    fn test_candidate_past_end_is_rejected() {
        let candidate = ClipCandidate {
            start_time: Some(50.0),
            end_time: Some(70.0),
            ..Default::default()
        };
        assert!(clip_from_candidate(&video(60.0), candidate).is_err());
    }

    #[test]
    fn test_candidate_without_times_is_rejected() {
        let candidate = ClipCandidate {
            start_time: Some(1.0),
            ..Default::default()
        };
        assert!(clip_from_candidate(&video(60.0), candidate).is_err());
    }

    #[test]
    fn test_metadata_dedups_keywords() {
        let vid = VideoId::from_string("v1");
        let a = Clip::new(vid.clone(), 60.0, 0.0, 5.0)
            .unwrap()
            .with_keywords(vec!["rust".into(), "async".into()]);
        let b = Clip::new(vid, 60.0, 5.0, 10.0)
            .unwrap()
            .with_keywords(vec!["async".into(), "tokio".into()]);
        let splice = Splice::new(
            "Trending Splice - 20260101",
            Layout::SplitScreen,
            SpliceMode::Trending,
            30,
            vec![a.id.clone(), b.id.clone()],
        )
        .unwrap();

        let metadata = splice_metadata(&splice, &[a, b]);
        assert_eq!(metadata["keywords"], json!(["rust", "async", "tokio"]));
        assert_eq!(metadata["mode"], json!("trending"));
        assert_eq!(metadata["num_clips"], json!(2));
    }
}
