//! Pipeline tests against the in-memory store, a file-writing fake media
//! backend and a mocked AI service.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use csplice_ai_client::{AiClientConfig, AnalysisClient, Sleeper};
use csplice_media::{
    ClipExtraction, Composition, MediaError, MediaResult, Optimization, Thumbnail, VideoInfo,
};
use csplice_models::{
    Clip, ExportOptions, ExportStatus, Layout, Platform, SourceVideo, SpliceMode, SpliceStatus,
    VideoStatus,
};
use csplice_queue::JobQueue;
use csplice_store::{MemoryStore, RecordStore};
use csplice_worker::{
    AnalysisBackend, JobExecutor, MediaBackend, Orchestrator, SpliceRequest, StageOutcome,
    WorkerConfig,
};

const WAIT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeMedia {
    source_duration: f64,
    fail_compose: bool,
    fail_optimize: bool,
    fail_thumbnail: bool,
    thumbnails: Mutex<Vec<Thumbnail>>,
    /// Extraction output path → clip start time
    extracted: Mutex<HashMap<PathBuf, f64>>,
    compositions: Mutex<Vec<Composition>>,
    optimizations: Mutex<Vec<Optimization>>,
}

impl FakeMedia {
    fn new(source_duration: f64) -> Self {
        Self {
            source_duration,
            ..Default::default()
        }
    }
}

#[async_trait]
impl MediaBackend for FakeMedia {
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| MediaError::FileNotFound(path.to_path_buf()))?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let duration = if name.starts_with("splice_") || name.starts_with("export_") {
            6.0
        } else {
            self.source_duration
        };
        Ok(VideoInfo {
            duration,
            width: 1080,
            height: 1920,
            fps: 30.0,
            codec: "h264".to_string(),
            has_audio: true,
            size: meta.len(),
            bitrate: 2_000_000,
        })
    }

    async fn thumbnail(&self, request: &Thumbnail) -> MediaResult<()> {
        self.thumbnails.lock().unwrap().push(request.clone());
        if self.fail_thumbnail {
            return Err(MediaError::ffmpeg_failed("thumbnail failed", None, Some(1)));
        }
        tokio::fs::write(&request.output, b"jpeg").await?;
        Ok(())
    }

    async fn extract_clip(&self, request: &ClipExtraction) -> MediaResult<()> {
        tokio::fs::write(&request.output, b"clip").await?;
        self.extracted
            .lock()
            .unwrap()
            .insert(request.output.clone(), request.start);
        Ok(())
    }

    async fn compose(&self, composition: &Composition) -> MediaResult<()> {
        for input in &composition.inputs {
            if !input.exists() {
                return Err(MediaError::FileNotFound(input.clone()));
            }
        }
        self.compositions.lock().unwrap().push(composition.clone());
        if self.fail_compose {
            return Err(MediaError::ffmpeg_failed("compose failed", None, Some(1)));
        }
        tokio::fs::write(&composition.output, b"splice").await?;
        Ok(())
    }

    async fn optimize(&self, request: &Optimization) -> MediaResult<()> {
        self.optimizations.lock().unwrap().push(request.clone());
        tokio::fs::write(&request.output, b"partial").await?;
        if self.fail_optimize {
            return Err(MediaError::ffmpeg_failed(
                "encode failed",
                Some("Invalid argument".to_string()),
                Some(1),
            ));
        }
        Ok(())
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

fn ai_client(server: &MockServer) -> Arc<dyn AnalysisBackend> {
    let config = AiClientConfig::default()
        .with_base_url(server.uri())
        .with_api_key("test-key");
    Arc::new(AnalysisClient::with_sleeper(config, Arc::new(NoSleep)).unwrap())
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    orchestrator: Arc<Orchestrator>,
    executor: Arc<JobExecutor>,
    store: Arc<MemoryStore>,
    media: Arc<FakeMedia>,
    config: WorkerConfig,
    source: PathBuf,
    _dir: TempDir,
}

impl Harness {
    async fn start(media: FakeMedia, analysis: Option<Arc<dyn AnalysisBackend>>) -> Self {
        let dir = TempDir::new().unwrap();
        let config = WorkerConfig::rooted_at(dir.path());
        std::fs::create_dir_all(&config.upload_dir).unwrap();
        let source = config.upload_dir.join("talk.mp4");
        std::fs::write(&source, b"source").unwrap();

        let store = Arc::new(MemoryStore::new());
        let media = Arc::new(media);
        let (queue, receiver) = JobQueue::new(config.queue_capacity);
        let orchestrator = Arc::new(Orchestrator::new(
            store.clone(),
            media.clone(),
            analysis,
            queue,
            config.clone(),
        ));
        let executor = Arc::new(JobExecutor::new(orchestrator.clone(), &config));
        {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run(receiver).await });
        }

        Self {
            orchestrator,
            executor,
            store,
            media,
            config,
            source,
            _dir: dir,
        }
    }

    /// Insert an analyzed video with one 6s clip per virality score.
    async fn seed_clips(&self, duration: f64, virality: &[f64]) -> (SourceVideo, Vec<Clip>) {
        let mut video = SourceVideo::new("seeded", self.source.to_string_lossy(), duration);
        video.has_audio = true;
        video.mark_analyzed(json!({}));
        self.store.create_video(&video).await.unwrap();

        let clips: Vec<Clip> = virality
            .iter()
            .enumerate()
            .map(|(i, score)| {
                let start = i as f64 * 10.0;
                Clip::new(video.id.clone(), duration, start, start + 6.0)
                    .unwrap()
                    .with_scores(None, None, Some(*score))
            })
            .collect();
        self.store.create_clips(&clips).await.unwrap();
        (video, clips)
    }

    async fn rendered_splice(&self) -> csplice_models::Splice {
        let (video, _) = self.seed_clips(120.0, &[0.2, 0.8]).await;
        let splice = self
            .orchestrator
            .create_splice(SpliceRequest::new(
                vec![video.id],
                Layout::SplitScreen,
                SpliceMode::Trending,
                2,
            ))
            .await
            .unwrap();
        self.orchestrator.trigger_splice_render(&splice.id).await.unwrap();
        let splice = self.orchestrator.wait_for_splice(&splice.id, WAIT).await.unwrap();
        assert_eq!(splice.status, SpliceStatus::Completed);
        splice
    }

    fn scratch_files(&self) -> usize {
        std::fs::read_dir(&self.config.scratch_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.executor.shutdown();
    }
}

fn assert_positions_are_permutation(splice: &csplice_models::Splice) {
    let mut positions: Vec<usize> = splice.clips.iter().map(|c| c.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, (0..splice.num_clips).collect::<Vec<_>>());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_trending_splice_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "topics": ["launch"],
            "transcript": "welcome to the show"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let virality = [0.9, 0.1, 0.7, 0.3, 0.5];
    let mut candidates: Vec<serde_json::Value> = virality
        .iter()
        .enumerate()
        .map(|(i, score)| {
            json!({
                "start_time": i as f64 * 20.0,
                "end_time": i as f64 * 20.0 + 6.0,
                "virality_score": score,
                "keywords": ["launch"]
            })
        })
        .collect();
    // Runs past the end of the video and must be dropped.
    candidates.push(json!({ "start_time": 115.0, "end_time": 130.0, "virality_score": 1.0 }));
    Mock::given(method("POST"))
        .and(path("/extract_clips"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "clips": candidates })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/generate_splice"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate_caption"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "caption": "Top moments" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generate_hashtags"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "hashtags": ["#launch", "#viral"] })),
        )
        .mount(&server)
        .await;

    let harness = Harness::start(FakeMedia::new(120.0), Some(ai_client(&server))).await;
    let orchestrator = &harness.orchestrator;

    let video = orchestrator.ingest_video(&harness.source, None).await.unwrap();
    assert_eq!(video.status, VideoStatus::Uploaded);
    assert_eq!(video.duration, 120.0);
    assert_eq!(video.title, "talk");

    orchestrator.trigger_analysis(&video.id).await.unwrap();
    let video = orchestrator.wait_for_video(&video.id, WAIT).await.unwrap();
    assert_eq!(video.status, VideoStatus::Analyzed);
    assert_eq!(video.transcript.as_deref(), Some("welcome to the show"));

    let clips = harness.store.list_clips_for_video(&video.id).await.unwrap();
    assert_eq!(clips.len(), 5);
    for clip in &clips {
        assert_eq!(clip.duration, clip.end_time - clip.start_time);
        assert!(clip.start_time >= 0.0 && clip.start_time < clip.end_time);
        assert!(clip.end_time <= video.duration);
    }

    let splice = orchestrator
        .create_splice(
            SpliceRequest::new(vec![video.id.clone()], Layout::Grid, SpliceMode::Trending, 3)
                .with_target_duration(30),
        )
        .await
        .unwrap();
    assert_eq!(splice.status, SpliceStatus::Pending);
    assert!(splice.title.starts_with("Trending Splice - "));
    assert_positions_are_permutation(&splice);

    let by_id: HashMap<_, _> = clips.iter().map(|c| (c.id.clone(), c)).collect();
    let selected: Vec<f64> = splice
        .ordered_clip_ids()
        .iter()
        .map(|id| by_id[id].virality_score.unwrap())
        .collect();
    assert_eq!(selected, vec![0.9, 0.7, 0.5]);

    orchestrator.trigger_splice_render(&splice.id).await.unwrap();
    let splice = orchestrator.wait_for_splice(&splice.id, WAIT).await.unwrap();
    assert_eq!(splice.status, SpliceStatus::Completed, "{:?}", splice.error_message);
    assert_eq!(splice.output_duration, Some(6.0));
    assert_eq!(splice.caption.as_deref(), Some("Top moments"));
    assert_eq!(splice.hashtags, vec!["#launch".to_string(), "#viral".to_string()]);
    assert!(Path::new(splice.output_path.as_deref().unwrap()).is_file());

    // Inputs reach the compositor in splice order.
    let composition = harness.media.compositions.lock().unwrap()[0].clone();
    let extracted = harness.media.extracted.lock().unwrap().clone();
    let starts: Vec<f64> = composition.inputs.iter().map(|p| extracted[p]).collect();
    assert_eq!(starts, vec![0.0, 40.0, 80.0]);
    assert_eq!(composition.layout, Layout::Grid);
    assert_eq!(harness.scratch_files(), 0);
}

#[tokio::test]
async fn test_analysis_failure_marks_video_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let harness = Harness::start(FakeMedia::new(60.0), Some(ai_client(&server))).await;
    let orchestrator = &harness.orchestrator;

    let video = orchestrator.ingest_video(&harness.source, None).await.unwrap();
    orchestrator.trigger_analysis(&video.id).await.unwrap();
    let video = orchestrator.wait_for_video(&video.id, WAIT).await.unwrap();

    assert_eq!(video.status, VideoStatus::Failed);
    assert!(video.error_message.unwrap().contains("3 attempt(s)"));

    let err = orchestrator.trigger_analysis(&video.id).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_analysis_without_ai_service_fails() {
    let harness = Harness::start(FakeMedia::new(60.0), None).await;
    let video = harness
        .orchestrator
        .ingest_video(&harness.source, Some("offline"))
        .await
        .unwrap();

    let err = harness.orchestrator.run_analysis(&video.id).await.unwrap_err();
    assert!(err.is_external_api());

    let stored = harness.store.get_video(&video.id).await.unwrap().unwrap();
    assert_eq!(stored.status, VideoStatus::Failed);
    assert!(stored.error_message.unwrap().contains("not configured"));
}

#[tokio::test]
async fn test_ingest_writes_middle_frame_thumbnail() {
    let harness = Harness::start(FakeMedia::new(80.0), None).await;
    let video = harness
        .orchestrator
        .ingest_video(&harness.source, None)
        .await
        .unwrap();

    let thumbnail = PathBuf::from(video.thumbnail_path.clone().unwrap());
    assert!(thumbnail.starts_with(&harness.config.thumbnail_dir));
    assert!(thumbnail.exists());
    let requests = harness.media.thumbnails.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].at, Some(40.0));

    let stored = harness.store.get_video(&video.id).await.unwrap().unwrap();
    assert_eq!(stored.thumbnail_path, video.thumbnail_path);
}

#[tokio::test]
async fn test_ingest_survives_thumbnail_failure() {
    let media = FakeMedia {
        fail_thumbnail: true,
        ..FakeMedia::new(80.0)
    };
    let harness = Harness::start(media, None).await;
    let video = harness
        .orchestrator
        .ingest_video(&harness.source, None)
        .await
        .unwrap();

    assert!(video.thumbnail_path.is_none());
    assert_eq!(video.status, VideoStatus::Uploaded);
    assert!(harness.store.get_video(&video.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_ingest_missing_file_is_rejected() {
    let harness = Harness::start(FakeMedia::new(60.0), None).await;
    let err = harness
        .orchestrator
        .ingest_video(Path::new("/nonexistent/video.mp4"), None)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_not_enough_clips_is_rejected() {
    let harness = Harness::start(FakeMedia::new(60.0), None).await;
    let (video, _) = harness.seed_clips(60.0, &[0.4]).await;

    let err = harness
        .orchestrator
        .create_splice(SpliceRequest::new(vec![video.id], Layout::Grid, SpliceMode::Trending, 3))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_clips_of_failed_video_are_not_spliced() {
    let harness = Harness::start(FakeMedia::new(60.0), None).await;
    let (video, _) = harness.seed_clips(60.0, &[0.4, 0.9]).await;
    let mut failed = harness.store.get_video(&video.id).await.unwrap().unwrap();
    failed.mark_failed("analysis write failed");
    harness.store.update_video(&failed).await.unwrap();

    let err = harness
        .orchestrator
        .create_splice(SpliceRequest::new(
            vec![video.id],
            Layout::SplitScreen,
            SpliceMode::Trending,
            2,
        ))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_invalid_splice_parameters_are_rejected() {
    let harness = Harness::start(FakeMedia::new(60.0), None).await;
    let (video, _) = harness.seed_clips(60.0, &[0.1, 0.2, 0.3, 0.4, 0.5]).await;

    let three_in_split = SpliceRequest::new(
        vec![video.id.clone()],
        Layout::SplitScreen,
        SpliceMode::Semantic,
        3,
    );
    assert!(harness
        .orchestrator
        .create_splice(three_in_split)
        .await
        .unwrap_err()
        .is_validation());

    let too_long = SpliceRequest::new(vec![video.id], Layout::Grid, SpliceMode::Semantic, 2)
        .with_target_duration(90);
    assert!(harness
        .orchestrator
        .create_splice(too_long)
        .await
        .unwrap_err()
        .is_validation());
}

#[tokio::test]
async fn test_concurrent_renders_run_once() {
    let harness = Harness::start(FakeMedia::new(120.0), None).await;
    let (video, _) = harness.seed_clips(120.0, &[0.3, 0.6]).await;
    let splice = harness
        .orchestrator
        .create_splice(SpliceRequest::new(
            vec![video.id],
            Layout::SplitScreen,
            SpliceMode::Eclectic,
            2,
        ))
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        harness.orchestrator.run_splice_render(&splice.id),
        harness.orchestrator.run_splice_render(&splice.id),
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    assert_eq!(
        outcomes.iter().filter(|o| **o == StageOutcome::Completed).count(),
        1
    );
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, StageOutcome::Skipped { current } if current == "processing")));
    assert_eq!(harness.media.compositions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_render_failure_cleans_up() {
    let media = FakeMedia {
        fail_compose: true,
        ..FakeMedia::new(120.0)
    };
    let harness = Harness::start(media, None).await;
    let (video, _) = harness.seed_clips(120.0, &[0.3, 0.6]).await;
    let splice = harness
        .orchestrator
        .create_splice(SpliceRequest::new(
            vec![video.id],
            Layout::SplitScreen,
            SpliceMode::Trending,
            2,
        ))
        .await
        .unwrap();

    harness.orchestrator.trigger_splice_render(&splice.id).await.unwrap();
    let splice = harness.orchestrator.wait_for_splice(&splice.id, WAIT).await.unwrap();

    assert_eq!(splice.status, SpliceStatus::Failed);
    assert!(splice.error_message.unwrap().contains("compose failed"));
    assert_eq!(harness.scratch_files(), 0);

    // A failed splice can be rendered again.
    assert!(harness.orchestrator.trigger_splice_render(&splice.id).await.is_ok());
}

#[tokio::test]
async fn test_export_preconditions() {
    let harness = Harness::start(FakeMedia::new(120.0), None).await;
    let (video, _) = harness.seed_clips(120.0, &[0.3, 0.6]).await;
    let mut splice = harness
        .orchestrator
        .create_splice(SpliceRequest::new(
            vec![video.id],
            Layout::SplitScreen,
            SpliceMode::Trending,
            2,
        ))
        .await
        .unwrap();

    let pending = harness
        .orchestrator
        .create_export(&splice.id, ExportOptions::for_platform(Platform::Tiktok))
        .await
        .unwrap_err();
    assert!(pending.is_validation());

    splice.mark_completed("/nonexistent/splice.mp4", 10, 6.0);
    harness.store.update_splice(&splice).await.unwrap();
    let missing = harness
        .orchestrator
        .request_export(&splice.id, ExportOptions::for_platform(Platform::Tiktok))
        .await
        .unwrap_err();
    assert!(missing.is_validation());

    assert!(harness
        .store
        .list_exports_for_splice(&splice.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_rerender_waits_for_open_exports() {
    let harness = Harness::start(FakeMedia::new(120.0), None).await;
    let splice = harness.rendered_splice().await;
    let export = harness
        .orchestrator
        .create_export(&splice.id, ExportOptions::for_platform(Platform::Tiktok))
        .await
        .unwrap();

    let err = harness
        .orchestrator
        .trigger_splice_render(&splice.id)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    let err = harness
        .orchestrator
        .run_splice_render(&splice.id)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let stored = harness.store.get_splice(&splice.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SpliceStatus::Completed);
    assert!(Path::new(stored.output_path.as_deref().unwrap()).exists());

    harness
        .store
        .transition_export_status(&export.id, &[ExportStatus::Pending], ExportStatus::Failed)
        .await
        .unwrap();
    harness.orchestrator.trigger_splice_render(&splice.id).await.unwrap();
}

#[tokio::test]
async fn test_export_completes_and_expires() {
    let harness = Harness::start(FakeMedia::new(120.0), None).await;
    let splice = harness.rendered_splice().await;

    let options = ExportOptions::for_platform(Platform::YoutubeShorts).with_watermark("@channel");
    let export = harness
        .orchestrator
        .request_export(&splice.id, options)
        .await
        .unwrap();
    let export = harness
        .orchestrator
        .wait_for_export(&export.id, WAIT)
        .await
        .unwrap();

    assert_eq!(export.status, ExportStatus::Completed, "{:?}", export.error_message);
    assert_eq!(export.output_bitrate, Some(2_000_000));
    let completed_at = export.completed_at.unwrap();
    let expires_at = export.expires_at.unwrap();
    assert_eq!(expires_at - completed_at, chrono::Duration::days(7));

    let output = export.output_path.clone().unwrap();
    assert!(output.ends_with(&format!("export_{}_youtube_shorts.mp4", export.id)));

    let request = harness.media.optimizations.lock().unwrap()[0].clone();
    assert_eq!(request.platform, Platform::YoutubeShorts);
    assert_eq!(request.watermark_text.as_deref(), Some("@channel"));
    assert_eq!(request.input, PathBuf::from(splice.output_path.unwrap()));

    let before = harness
        .orchestrator
        .export_download(&export.id, completed_at + chrono::Duration::days(1))
        .await
        .unwrap();
    assert_eq!(before, PathBuf::from(output));

    let after = harness
        .orchestrator
        .export_download(&export.id, expires_at + chrono::Duration::seconds(1))
        .await
        .unwrap_err();
    assert!(after.is_validation());

    // Processed exports cannot be queued again.
    assert!(harness
        .orchestrator
        .trigger_export(&export.id)
        .await
        .unwrap_err()
        .is_validation());
}

#[tokio::test]
async fn test_failed_export_removes_partial_output() {
    let media = FakeMedia {
        fail_optimize: true,
        ..FakeMedia::new(120.0)
    };
    let harness = Harness::start(media, None).await;
    let splice = harness.rendered_splice().await;

    let export = harness
        .orchestrator
        .request_export(&splice.id, ExportOptions::for_platform(Platform::Tiktok))
        .await
        .unwrap();
    let export = harness
        .orchestrator
        .wait_for_export(&export.id, WAIT)
        .await
        .unwrap();

    assert_eq!(export.status, ExportStatus::Failed);
    assert!(export.error_message.unwrap().contains("encode failed"));
    assert!(export.output_path.is_none());

    let partial = harness
        .config
        .export_dir
        .join(format!("export_{}_tiktok.mp4", export.id));
    assert!(!partial.exists());

    let download = harness.orchestrator.export_download(&export.id, Utc::now()).await;
    assert!(download.unwrap_err().is_validation());
}
