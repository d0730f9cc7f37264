//! Splice pipeline worker binary.
//!
//! Runs the whole pipeline on one node over the video files given as
//! arguments: ingest, analyze, build a splice, render it and export it for
//! each configured platform.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use csplice_ai_client::{AiClientConfig, AnalysisClient};
use csplice_media::FfmpegRunner;
use csplice_models::{ExportOptions, Layout, Platform, SpliceMode, SpliceStatus, VideoStatus};
use csplice_queue::JobQueue;
use csplice_store::MemoryStore;
use csplice_worker::{
    AnalysisBackend, FfmpegBackend, JobExecutor, Orchestrator, SpliceRequest, WorkerConfig,
};

/// Options for the single-node run.
#[derive(Debug, Clone)]
struct BatchOptions {
    layout: Layout,
    mode: SpliceMode,
    num_clips: usize,
    target_duration: u32,
    force_fallback: bool,
    platforms: Vec<Platform>,
    watermark: Option<String>,
    stage_timeout: Duration,
}

impl BatchOptions {
    fn from_env() -> anyhow::Result<Self> {
        let layout = env_string("SPLICE_LAYOUT", "split_screen")
            .parse::<Layout>()
            .context("SPLICE_LAYOUT")?;
        let mode = env_string("SPLICE_MODE", "semantic")
            .parse::<SpliceMode>()
            .context("SPLICE_MODE")?;
        let platforms = env_string("EXPORT_PLATFORMS", "tiktok")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Platform>())
            .collect::<Result<Vec<_>, _>>()
            .context("EXPORT_PLATFORMS")?;

        Ok(Self {
            layout,
            mode,
            num_clips: env_string("SPLICE_NUM_CLIPS", "2").parse().context("SPLICE_NUM_CLIPS")?,
            target_duration: env_string("SPLICE_TARGET_DURATION", "30")
                .parse()
                .context("SPLICE_TARGET_DURATION")?,
            force_fallback: env_string("SPLICE_FORCE_FALLBACK", "false")
                .parse()
                .context("SPLICE_FORCE_FALLBACK")?,
            platforms,
            watermark: std::env::var("EXPORT_WATERMARK").ok().filter(|s| !s.is_empty()),
            stage_timeout: Duration::from_secs(
                env_string("STAGE_TIMEOUT_SECS", "3600")
                    .parse()
                    .context("STAGE_TIMEOUT_SECS")?,
            ),
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("csplice=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize tracing: {e}");
        std::process::exit(1);
    }

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let metrics_handle = if metrics_enabled {
        match csplice_worker::metrics::init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to install metrics recorder: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    info!("Starting csplice-worker");

    if let Err(e) = run().await {
        error!("Worker failed: {:#}", e);
        std::process::exit(1);
    }

    if let Some(handle) = metrics_handle {
        info!("Final metrics:\n{}", handle.render());
    }
    info!("Worker shutdown complete");
}

async fn run() -> anyhow::Result<()> {
    let inputs: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if inputs.is_empty() {
        bail!("usage: csplice-worker <video>...");
    }

    csplice_media::check_ffmpeg()?;
    csplice_media::check_ffprobe()?;

    let config = WorkerConfig::from_env();
    let batch = BatchOptions::from_env()?;
    info!("Worker config: {:?}", config);

    let ai_config = AiClientConfig::from_env();
    let analysis: Option<Arc<dyn AnalysisBackend>> = if ai_config.is_configured() {
        Some(Arc::new(AnalysisClient::new(ai_config)?))
    } else {
        warn!("AI_API_KEY not set, analysis will fail and selection uses fallback ranking");
        None
    };

    let runner = FfmpegRunner::new().with_timeout(config.ffmpeg_timeout);
    let (queue, receiver) = JobQueue::new(config.queue_capacity);
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(MemoryStore::new()),
        Arc::new(FfmpegBackend::new(runner)),
        analysis,
        queue,
        config.clone(),
    ));

    let executor = Arc::new(JobExecutor::new(Arc::clone(&orchestrator), &config));
    let executor_task = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move { executor.run(receiver).await })
    };

    let outcome = tokio::select! {
        result = run_batch(&orchestrator, &inputs, &batch) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    executor.shutdown();
    match executor_task.await {
        Ok(Err(e)) => error!("Executor error: {}", e),
        Err(e) => error!("Executor task panicked: {}", e),
        Ok(Ok(())) => {}
    }
    outcome
}

async fn run_batch(
    orchestrator: &Orchestrator,
    inputs: &[PathBuf],
    batch: &BatchOptions,
) -> anyhow::Result<()> {
    let mut analyzed = Vec::new();
    for path in inputs {
        let video = orchestrator.ingest_video(path, None).await?;
        orchestrator.trigger_analysis(&video.id).await?;
        let video = orchestrator.wait_for_video(&video.id, batch.stage_timeout).await?;
        if video.status == VideoStatus::Analyzed {
            analyzed.push(video.id);
        } else {
            warn!(
                video_id = %video.id,
                "Analysis failed: {}",
                video.error_message.as_deref().unwrap_or("unknown error")
            );
        }
    }
    if analyzed.is_empty() {
        bail!("no video was analyzed successfully");
    }

    let mut request = SpliceRequest::new(analyzed, batch.layout, batch.mode, batch.num_clips)
        .with_target_duration(batch.target_duration);
    if batch.force_fallback {
        request = request.with_fallback();
    }
    let splice = orchestrator.create_splice(request).await?;
    orchestrator.trigger_splice_render(&splice.id).await?;
    let splice = orchestrator.wait_for_splice(&splice.id, batch.stage_timeout).await?;
    if splice.status != SpliceStatus::Completed {
        bail!(
            "render failed: {}",
            splice.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    info!(
        splice_id = %splice.id,
        "Splice ready at {}",
        splice.output_path.as_deref().unwrap_or_default()
    );

    for platform in &batch.platforms {
        let mut options = ExportOptions::for_platform(*platform);
        if let Some(text) = &batch.watermark {
            options = options.with_watermark(text.clone());
        }
        let export = orchestrator.request_export(&splice.id, options).await?;
        let export = orchestrator.wait_for_export(&export.id, batch.stage_timeout).await?;
        match orchestrator.export_download(&export.id, chrono::Utc::now()).await {
            Ok(path) => info!(export_id = %export.id, platform = %platform, "Export ready at {}", path.display()),
            Err(_) => warn!(
                export_id = %export.id,
                platform = %platform,
                "Export failed: {}",
                export.error_message.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    Ok(())
}
