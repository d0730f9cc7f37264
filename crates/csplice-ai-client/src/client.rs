//! AI service HTTP client.

use std::sync::Arc;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use csplice_models::{Platform, SpliceMode};

use crate::config::AiClientConfig;
use crate::error::{AiError, AiResult};
use crate::retry::{retry_with_policy, Sleeper, TokioSleeper};
use crate::types::{
    task, AnalysisPayload, CaptionPayload, CaptionResponse, ClipCandidate, ClipDescriptor,
    ClipExtractionPayload, ClipExtractionResponse, ExtractionParams, HashtagPayload,
    HashtagResponse, SplicePayload, SpliceRecommendation,
};

/// Default cap on generated hashtags
pub const DEFAULT_MAX_HASHTAGS: u32 = 10;

/// Client for the AI analysis service.
pub struct AnalysisClient {
    http: Client,
    config: AiClientConfig,
    base_url: String,
    sleeper: Arc<dyn Sleeper>,
}

impl AnalysisClient {
    /// Create a new client.
    pub fn new(config: AiClientConfig) -> AiResult<Self> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Create a client with a custom backoff sleeper.
    pub fn with_sleeper(config: AiClientConfig, sleeper: Arc<dyn Sleeper>) -> AiResult<Self> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| AiError::Config(format!("invalid base URL '{}': {}", config.base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AiError::Config(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AiError::Network)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
            sleeper,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> AiResult<Self> {
        Self::new(AiClientConfig::from_env())
    }

    pub fn config(&self) -> &AiClientConfig {
        &self.config
    }

    /// Analyze a video. Returns the raw analysis payload.
    pub async fn analyze(
        &self,
        video_path: &str,
        transcript: Option<&str>,
        audio_features: Option<&serde_json::Value>,
    ) -> AiResult<serde_json::Value> {
        info!("Analyzing video: {}", video_path);
        let payload = AnalysisPayload {
            model: &self.config.model,
            task: task::VIDEO_ANALYSIS,
            video_path,
            include_attention_scores: true,
            include_topics: true,
            include_entities: true,
            include_sentiment: true,
            transcript,
            audio_features,
        };

        let result: serde_json::Value = self
            .post_with_retry("analyze", task::VIDEO_ANALYSIS, &payload)
            .await?;
        if !result.is_object() {
            return Err(AiError::InvalidResponse(
                "analysis payload is not a JSON object".to_string(),
            ));
        }
        Ok(result)
    }

    /// Ask the service for clip candidates.
    pub async fn extract_clips(
        &self,
        video_path: &str,
        analysis: &serde_json::Value,
        params: ExtractionParams,
    ) -> AiResult<Vec<ClipCandidate>> {
        let payload = ClipExtractionPayload {
            model: &self.config.model,
            task: task::CLIP_EXTRACTION,
            video_path,
            analysis_result: analysis,
            params,
        };

        let response: ClipExtractionResponse = self
            .post_with_retry("extract_clips", task::CLIP_EXTRACTION, &payload)
            .await?;
        info!("Extracted {} clip candidates", response.clips.len());
        Ok(response.clips)
    }

    /// Ask the service to pick `num_clips` clips for a splice.
    pub async fn recommend_selection(
        &self,
        clips: &[ClipDescriptor],
        mode: SpliceMode,
        target_duration: u32,
        num_clips: usize,
    ) -> AiResult<SpliceRecommendation> {
        let payload = SplicePayload {
            model: &self.config.model,
            task: task::SPLICE_GENERATION,
            clips,
            mode,
            target_duration,
            num_clips,
        };

        let recommendation: SpliceRecommendation = self
            .post_with_retry("generate_splice", task::SPLICE_GENERATION, &payload)
            .await?;
        info!(
            "Received {} mode recommendation with {} clips",
            mode,
            recommendation.selected_clips.len()
        );
        Ok(recommendation)
    }

    /// Generate a caption. Failures yield an empty string.
    pub async fn generate_caption(&self, metadata: &serde_json::Value, platform: Platform) -> String {
        let payload = CaptionPayload {
            model: &self.config.model,
            task: task::CAPTION_GENERATION,
            metadata,
            platform,
        };

        match self
            .post_once::<_, CaptionResponse>("generate_caption", &payload)
            .await
        {
            Ok(response) => response.caption,
            Err(e) => {
                warn!("Caption generation failed for {}: {}", platform, e);
                String::new()
            }
        }
    }

    /// Generate hashtags. Failures yield an empty list.
    pub async fn generate_hashtags(
        &self,
        metadata: &serde_json::Value,
        platform: Platform,
        max_hashtags: u32,
    ) -> Vec<String> {
        let payload = HashtagPayload {
            model: &self.config.model,
            task: task::HASHTAG_GENERATION,
            metadata,
            platform,
            max_hashtags,
        };

        match self
            .post_once::<_, HashtagResponse>("generate_hashtags", &payload)
            .await
        {
            Ok(response) => {
                let mut hashtags = response.hashtags;
                hashtags.truncate(max_hashtags as usize);
                hashtags
            }
            Err(e) => {
                warn!("Hashtag generation failed for {}: {}", platform, e);
                Vec::new()
            }
        }
    }

    async fn post_with_retry<B, R>(&self, endpoint: &str, task: &str, body: &B) -> AiResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        retry_with_policy(&self.config.retry, self.sleeper.as_ref(), task, || {
            self.post_once(endpoint, body)
        })
        .await
    }

    /// Single POST with bearer auth; non-2xx is an error.
    async fn post_once<B, R>(&self, endpoint: &str, body: &B) -> AiResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let mut request = self.http.post(&url).json(body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| AiError::InvalidResponse(format!("{} returned malformed JSON: {}", endpoint, e)))
    }
}
