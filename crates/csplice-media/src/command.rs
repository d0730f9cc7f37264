//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, warn};

use csplice_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::progress::{FfmpegProgress, ProgressParser, StderrLine};

/// Lines of stderr kept for error reports
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
struct Input {
    path: PathBuf,
    /// Options placed before this input's `-i`
    options: Vec<String>,
}

impl Input {
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            options: Vec::new(),
        }
    }
}

/// Builder for one ffmpeg invocation with any number of inputs.
///
/// Input options (`seek`, `duration`, `input_arg`) attach to the most
/// recently added input; everything else is an output option.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<Input>,
    output: PathBuf,
    output_options: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self::with_inputs([input], output)
    }

    pub fn with_inputs<I, P>(inputs: I, output: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            inputs: inputs.into_iter().map(Input::new).collect(),
            output: output.as_ref().to_path_buf(),
            output_options: Vec::new(),
        }
    }

    pub fn add_input(mut self, input: impl AsRef<Path>) -> Self {
        self.inputs.push(Input::new(input));
        self
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(input) = self.inputs.last_mut() {
            input.options.push(arg.into());
        }
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_options.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_options.extend(args.into_iter().map(Into::into));
        self
    }

    fn opt(self, flag: &str, value: impl Into<String>) -> Self {
        self.output_arg(flag).output_arg(value)
    }

    /// Input-side seek, frame accurate with re-encoding.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Input-side read limit.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.opt("-vf", filter)
    }

    pub fn filter_complex(self, graph: impl Into<String>) -> Self {
        self.opt("-filter_complex", graph)
    }

    /// Map a stream specifier or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.opt("-map", spec)
    }

    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    pub fn frame_rate(self, fps: u32) -> Self {
        self.opt("-r", fps.to_string())
    }

    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.opt("-pix_fmt", format)
    }

    pub fn faststart(self) -> Self {
        self.opt("-movflags", "+faststart")
    }

    /// Video codec, preset, CRF and optional bitrate.
    pub fn video_encoding(self, encoding: &EncodingConfig) -> Self {
        let cmd = self
            .opt("-c:v", encoding.codec.as_str())
            .opt("-preset", encoding.preset.as_str())
            .opt("-crf", encoding.crf.to_string());
        match &encoding.video_bitrate {
            Some(bitrate) => cmd.opt("-b:v", bitrate.as_str()),
            None => cmd,
        }
    }

    /// Audio codec and optional bitrate. Kept apart from
    /// [`FfmpegCommand::video_encoding`] so silent outputs can skip it.
    pub fn audio_encoding(self, encoding: &EncodingConfig) -> Self {
        let cmd = self.opt("-c:a", encoding.audio_codec.as_str());
        match &encoding.audio_bitrate {
            Some(bitrate) => cmd.opt("-b:a", bitrate.as_str()),
            None => cmd,
        }
    }

    /// Full argument list, overwriting the output and streaming progress to stderr.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-v", "error", "-progress", "pipe:2"]
            .into_iter()
            .map(String::from)
            .collect();
        for input in &self.inputs {
            args.extend(input.options.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().into_owned());
        }
        args.extend(self.output_options.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Last lines of non-progress stderr output.
#[derive(Debug, Default)]
struct StderrTail(VecDeque<String>);

impl StderrTail {
    fn push(&mut self, line: String) {
        if self.0.len() == STDERR_TAIL_LINES {
            self.0.pop_front();
        }
        self.0.push_back(line);
    }

    fn joined(&self) -> Option<String> {
        (!self.0.is_empty()).then(|| self.0.iter().cloned().collect::<Vec<_>>().join("\n"))
    }
}

/// Spawns ffmpeg, tracks progress and enforces an optional watchdog timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill ffmpeg and fail with [`MediaError::Timeout`] after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run `cmd`, calling `on_progress` at the end of each progress block.
    /// A failed run reports the tail of ffmpeg's diagnostics.
    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, on_progress: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("ffmpeg stderr not captured"))?;
        let reader = tokio::spawn(read_stderr(stderr, on_progress));

        let status = self.wait(&mut child).await;
        let tail = reader.await.unwrap_or_default();

        match status {
            Ok(Some(code)) => Err(MediaError::ffmpeg_failed(
                "ffmpeg exited with non-zero status",
                tail.joined(),
                code,
            )),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// `Ok(None)` on success, `Ok(Some(exit_code))` on failure.
    async fn wait(&self, child: &mut Child) -> MediaResult<Option<Option<i32>>> {
        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("ffmpeg exceeded {}s, killing it", limit.as_secs());
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(limit.as_secs()));
                }
            },
            None => child.wait().await?,
        };
        Ok((!status.success()).then(|| status.code()))
    }
}

async fn read_stderr<F>(stderr: ChildStderr, on_progress: F) -> StderrTail
where
    F: Fn(FfmpegProgress),
{
    let mut lines = BufReader::new(stderr).lines();
    let mut parser = ProgressParser::default();
    let mut tail = StderrTail::default();
    while let Ok(Some(line)) = lines.next_line().await {
        match parser.feed(&line) {
            StderrLine::Progress(Some(snapshot)) => on_progress(snapshot),
            StderrLine::Progress(None) => {}
            StderrLine::Diagnostic => tail.push(line),
        }
    }
    tail
}

/// Locate ffmpeg on PATH.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Locate ffprobe on PATH.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
