//! Seams between the orchestrator and its external tools.
//!
//! Production wires [`FfmpegBackend`] and [`AnalysisClient`]; tests swap in
//! fakes that write files and return canned AI payloads.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use csplice_ai_client::{
    AiResult, AnalysisClient, ClipCandidate, ClipDescriptor, ExtractionParams, SpliceRecommendation,
};
use csplice_media::{
    ClipExtraction, Composition, FfmpegRunner, MediaResult, Optimization, Thumbnail, VideoInfo,
};
use csplice_models::{Platform, SpliceMode};

/// Probe, extract, compose and re-encode.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo>;
    async fn thumbnail(&self, request: &Thumbnail) -> MediaResult<()>;
    async fn extract_clip(&self, request: &ClipExtraction) -> MediaResult<()>;
    async fn compose(&self, composition: &Composition) -> MediaResult<()>;
    async fn optimize(&self, request: &Optimization) -> MediaResult<()>;
}

/// Media backend driving the ffmpeg and ffprobe binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    runner: FfmpegRunner,
}

impl FfmpegBackend {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo> {
        csplice_media::probe_video_with_timeout(path, self.runner.timeout()).await
    }

    async fn thumbnail(&self, request: &Thumbnail) -> MediaResult<()> {
        csplice_media::generate_thumbnail(request, &self.runner).await
    }

    async fn extract_clip(&self, request: &ClipExtraction) -> MediaResult<()> {
        csplice_media::extract_clip(request, &self.runner).await
    }

    async fn compose(&self, composition: &Composition) -> MediaResult<()> {
        csplice_media::compose(composition, &self.runner).await
    }

    async fn optimize(&self, request: &Optimization) -> MediaResult<()> {
        csplice_media::optimize(request, &self.runner).await
    }
}

/// The AI analysis service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, video_path: &str, transcript: Option<String>) -> AiResult<Value>;

    async fn extract_clips(
        &self,
        video_path: &str,
        analysis: &Value,
        params: ExtractionParams,
    ) -> AiResult<Vec<ClipCandidate>>;

    async fn recommend_selection(
        &self,
        clips: &[ClipDescriptor],
        mode: SpliceMode,
        target_duration: u32,
        num_clips: usize,
    ) -> AiResult<SpliceRecommendation>;

    /// Best-effort; empty on failure.
    async fn generate_caption(&self, metadata: &Value, platform: Platform) -> String;

    /// Best-effort; empty on failure.
    async fn generate_hashtags(&self, metadata: &Value, platform: Platform) -> Vec<String>;
}

#[async_trait]
impl AnalysisBackend for AnalysisClient {
    async fn analyze(&self, video_path: &str, transcript: Option<String>) -> AiResult<Value> {
        AnalysisClient::analyze(self, video_path, transcript.as_deref(), None).await
    }

    async fn extract_clips(
        &self,
        video_path: &str,
        analysis: &Value,
        params: ExtractionParams,
    ) -> AiResult<Vec<ClipCandidate>> {
        AnalysisClient::extract_clips(self, video_path, analysis, params).await
    }

    async fn recommend_selection(
        &self,
        clips: &[ClipDescriptor],
        mode: SpliceMode,
        target_duration: u32,
        num_clips: usize,
    ) -> AiResult<SpliceRecommendation> {
        AnalysisClient::recommend_selection(self, clips, mode, target_duration, num_clips).await
    }

    async fn generate_caption(&self, metadata: &Value, platform: Platform) -> String {
        AnalysisClient::generate_caption(self, metadata, platform).await
    }

    async fn generate_hashtags(&self, metadata: &Value, platform: Platform) -> Vec<String> {
        AnalysisClient::generate_hashtags(
            self,
            metadata,
            platform,
            csplice_ai_client::client::DEFAULT_MAX_HASHTAGS,
        )
        .await
    }
}
