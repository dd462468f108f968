//! Render jobs and the ffmpeg backend.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use clipweave_common::config::RenderDefaults;
use clipweave_common::error::{ClipweaveError, ClipweaveResult};
use clipweave_model::{Content, RenderContext};
use serde::{Deserialize, Serialize};

use crate::compiler::{compile_document, CompiledDocument};
use crate::graph::{map_label, number, Filter};
use crate::preview::{compile_preview, CompiledPreview};

/// Container and codec combination of the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Mp4H264,
    Mp4H265,
    Webm,
    Gif,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output format '{0}' (expected mp4-h264, mp4-h265, webm or gif)")]
pub struct UnknownFormat(String);

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4H264 => "mp4-h264",
            OutputFormat::Mp4H265 => "mp4-h265",
            OutputFormat::Webm => "webm",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4H264 | OutputFormat::Mp4H265 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Gif => "gif",
        }
    }

    /// Guess the format from an output file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" | "mov" => Some(OutputFormat::Mp4H264),
            "webm" => Some(OutputFormat::Webm),
            "gif" => Some(OutputFormat::Gif),
            _ => None,
        }
    }

    pub fn supports_audio(&self) -> bool {
        !matches!(self, OutputFormat::Gif)
    }
}

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4-h264" | "mp4" | "h264" => Ok(OutputFormat::Mp4H264),
            "mp4-h265" | "h265" | "hevc" => Ok(OutputFormat::Mp4H265),
            "webm" => Ok(OutputFormat::Webm),
            "gif" => Ok(OutputFormat::Gif),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A render job ready to be executed.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Output file path.
    pub output_path: PathBuf,

    pub format: OutputFormat,

    /// Replace an existing output file.
    pub overwrite: bool,

    /// Build and report the ffmpeg command without running it.
    pub dry_run: bool,

    /// Sample rate every audio track is resampled to.
    pub audio_sample_rate: u32,

    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,

    /// ffmpeg executable name or path.
    pub ffmpeg_binary: String,
}

impl RenderJob {
    /// A job using the configured defaults. The format comes from the
    /// output extension when it names one, else from the configuration.
    pub fn from_defaults(output_path: impl Into<PathBuf>, defaults: &RenderDefaults) -> ClipweaveResult<Self> {
        let output_path = output_path.into();
        let format = match OutputFormat::from_path(&output_path) {
            Some(format) => format,
            None => defaults
                .format
                .parse()
                .map_err(|e: UnknownFormat| ClipweaveError::config(e.to_string()))?,
        };
        Ok(Self {
            output_path,
            format,
            overwrite: false,
            dry_run: false,
            audio_sample_rate: defaults.audio_sample_rate,
            video_bitrate_kbps: defaults.video_bitrate_kbps,
            audio_bitrate_kbps: defaults.audio_bitrate_kbps,
            ffmpeg_binary: defaults.ffmpeg_binary.clone(),
        })
    }
}

/// The ffmpeg invocation for one job.
#[derive(Debug, Clone, Serialize)]
pub struct RenderPlan {
    pub output_path: PathBuf,
    pub ffmpeg_args: Vec<String>,
    pub total_frames: u64,
    pub expected_duration_secs: f64,
    pub debug_report: String,
}

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Render progress report.
#[derive(Debug, Clone, Serialize)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    pub frames_rendered: u64,
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: RenderStage,
}

impl RenderProgress {
    fn at_stage(stage: RenderStage, progress: f64, total_frames: u64) -> Self {
        Self {
            progress,
            frames_rendered: (progress * total_frames as f64).round() as u64,
            total_frames,
            eta_secs: 0.0,
            stage,
        }
    }
}

/// Stages of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Executes render plans.
pub trait RenderBackend: Send {
    fn render(&mut self, plan: &RenderPlan, progress: Option<ProgressCallback>) -> ClipweaveResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}

/// Compile `root` and render it according to `job`. Returns the plan that
/// was (or, for dry runs, would have been) executed.
pub async fn render_document(
    root: &Content,
    context: RenderContext,
    job: RenderJob,
    progress: Option<ProgressCallback>,
) -> ClipweaveResult<RenderPlan> {
    tracing::info!(
        output = %job.output_path.display(),
        format = %job.format,
        dry_run = job.dry_run,
        "Starting render"
    );

    if let Some(cb) = &progress {
        cb(RenderProgress::at_stage(RenderStage::Preparing, 0.0, 0));
    }

    let document = compile_document(root, context, job.audio_sample_rate)?;
    let plan = build_render_plan(document, &job);
    execute(plan, &job, progress).await
}

/// Compile and render a single frame to a still image.
pub async fn render_preview(
    root: &Content,
    context: RenderContext,
    frame: u64,
    job: RenderJob,
) -> ClipweaveResult<RenderPlan> {
    tracing::info!(output = %job.output_path.display(), frame, "Starting preview");
    let preview = compile_preview(root, context, frame)?;
    let plan = build_preview_plan(preview, &job);
    execute(plan, &job, None).await
}

async fn execute(
    plan: RenderPlan,
    job: &RenderJob,
    progress: Option<ProgressCallback>,
) -> ClipweaveResult<RenderPlan> {
    if let Some(parent) = job.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    if job.dry_run {
        write_debug_report(&plan);
        tracing::info!(args = plan.ffmpeg_args.len(), "Dry run, ffmpeg not started");
        return Ok(plan);
    }
    if !job.overwrite && job.output_path.exists() {
        return Err(ClipweaveError::render(format!(
            "{} already exists (pass overwrite to replace it)",
            job.output_path.display()
        )));
    }
    write_debug_report(&plan);

    let mut backend: Box<dyn RenderBackend> = Box::new(FfmpegBackend::new(&job.ffmpeg_binary));
    if !backend.is_available() {
        return Err(ClipweaveError::unsupported(format!(
            "No supported render backend found (expected {} in PATH)",
            job.ffmpeg_binary
        )));
    }
    tracing::info!(backend = backend.name(), "Using render backend");

    tokio::task::spawn_blocking(move || backend.render(&plan, progress).map(|()| plan))
        .await
        .map_err(|e| ClipweaveError::render(format!("Render task failed: {e}")))?
}

fn write_debug_report(plan: &RenderPlan) {
    let debug_path = plan.output_path.with_extension("ffmpeg-debug.txt");
    if let Err(err) = std::fs::write(&debug_path, &plan.debug_report) {
        tracing::warn!(error = %err, path = %debug_path.display(), "Failed to write ffmpeg debug report");
    } else {
        tracing::info!(path = %debug_path.display(), "Wrote ffmpeg debug report");
    }
}

/// Lay out the full ffmpeg command for a compiled document.
pub fn build_render_plan(document: CompiledDocument, job: &RenderJob) -> RenderPlan {
    let CompiledDocument {
        mut graph,
        mut video,
        mut audio,
        context,
        duration_secs,
    } = document;
    let total_frames = (duration_secs * context.fps).ceil().max(0.0) as u64;

    if job.format == OutputFormat::Gif {
        if let Some(stream) = video.take() {
            let (frames, for_palette) = graph.split_video(stream);
            let palette = graph.video(for_palette, Filter::new("palettegen"));
            video = Some(graph.video_join(vec![frames, palette], Filter::new("paletteuse")));
        }
    }
    if !job.format.supports_audio() {
        if let Some(stream) = audio.take() {
            graph.sink_audio(stream);
        }
    }

    let mut args = base_args(job.overwrite);
    for input in graph.inputs() {
        args.extend(input.to_args());
    }
    let filter = graph.to_filter_complex();
    args.push("-filter_complex".to_string());
    args.push(filter.clone());
    if let Some(stream) = &video {
        args.push("-map".to_string());
        args.push(map_label(stream.label()));
        args.push("-r".to_string());
        args.push(number(context.fps));
    }
    if let Some(stream) = &audio {
        args.push("-map".to_string());
        args.push(map_label(stream.label()));
    }
    args.push("-t".to_string());
    args.push(number(duration_secs));
    args.extend(codec_args(job, video.is_some(), audio.is_some()));
    args.push(job.output_path.display().to_string());

    let debug_report = debug_report(&args, &graph.to_pretty(), duration_secs, total_frames);
    tracing::info!(
        duration_secs,
        frames = total_frames,
        inputs = graph.inputs().len(),
        filter_len = filter.len(),
        "Render plan built"
    );

    RenderPlan {
        output_path: job.output_path.clone(),
        ffmpeg_args: args,
        total_frames,
        expected_duration_secs: duration_secs,
        debug_report,
    }
}

/// Lay out the ffmpeg command for a still frame.
pub fn build_preview_plan(preview: CompiledPreview, job: &RenderJob) -> RenderPlan {
    let mut args = base_args(job.overwrite);
    for input in preview.graph.inputs() {
        args.extend(input.to_args());
    }
    args.push("-filter_complex".to_string());
    args.push(preview.graph.to_filter_complex());
    args.push("-map".to_string());
    args.push(map_label(preview.video.label()));
    args.push("-frames:v".to_string());
    args.push("1".to_string());
    args.push(job.output_path.display().to_string());

    let debug_report = debug_report(&args, &preview.graph.to_pretty(), 0.0, 1);
    RenderPlan {
        output_path: job.output_path.clone(),
        ffmpeg_args: args,
        total_frames: 1,
        expected_duration_secs: 0.0,
        debug_report,
    }
}

fn base_args(overwrite: bool) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        if overwrite { "-y" } else { "-n" }.to_string(),
    ]
}

fn debug_report(args: &[String], graph: &str, duration_secs: f64, total_frames: u64) -> String {
    format!(
        "generated={}\nduration_secs={:.3}\nframes={}\nffmpeg_args={}\n\nfilter_complex:\n{}\n",
        chrono::Local::now().to_rfc3339(),
        duration_secs,
        total_frames,
        args.iter().map(|arg| shell_quote(arg)).collect::<Vec<_>>().join(" "),
        graph,
    )
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

fn codec_args(job: &RenderJob, has_video: bool, has_audio: bool) -> Vec<String> {
    let video_bitrate = format!("{}k", job.video_bitrate_kbps.max(1000));
    let audio_bitrate = format!("{}k", job.audio_bitrate_kbps.max(64));

    let (video, audio): (Vec<&str>, Vec<&str>) = match job.format {
        OutputFormat::Mp4H264 => (
            vec!["-c:v", "libx264", "-preset", "medium", "-profile:v", "high", "-pix_fmt", "yuv420p", "-b:v"],
            vec!["-c:a", "aac", "-b:a"],
        ),
        OutputFormat::Mp4H265 => (
            vec!["-c:v", "libx265", "-preset", "medium", "-pix_fmt", "yuv420p", "-b:v"],
            vec!["-c:a", "aac", "-b:a"],
        ),
        OutputFormat::Webm => (
            vec!["-c:v", "libvpx-vp9", "-pix_fmt", "yuva420p", "-b:v"],
            vec!["-c:a", "libopus", "-b:a"],
        ),
        OutputFormat::Gif => (Vec::new(), Vec::new()),
    };

    let mut args = Vec::new();
    if has_video && !video.is_empty() {
        args.extend(video.into_iter().map(String::from));
        args.push(video_bitrate);
    }
    if has_audio && !audio.is_empty() {
        args.extend(audio.into_iter().map(String::from));
        args.push(audio_bitrate);
    }
    if matches!(job.format, OutputFormat::Mp4H264 | OutputFormat::Mp4H265) {
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
    }
    args
}

/// Renders by spawning ffmpeg and following its `-progress` output.
pub struct FfmpegBackend {
    binary: String,
}

impl FfmpegBackend {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run_ffmpeg(&self, plan: &RenderPlan, progress: Option<ProgressCallback>) -> ClipweaveResult<()> {
        tracing::debug!(args = ?plan.ffmpeg_args, "Running ffmpeg");
        let mut cmd = Command::new(&self.binary);
        cmd.args(&plan.ffmpeg_args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ClipweaveError::render(format!("Failed to start {}: {e}", self.binary)))?;

        tracing::info!(
            pid = child.id(),
            args_len = plan.ffmpeg_args.len(),
            total_frames = plan.total_frames,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClipweaveError::render("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClipweaveError::render("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks once a full stderr pipe goes unread.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let mut latest = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = std::time::Instant::now();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| ClipweaveError::render(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest.update(key, value);
            if key != "progress" {
                continue;
            }
            if latest.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest.out_time_secs;
                last_progress_wall = std::time::Instant::now();
            }
            if let Some(cb) = &progress {
                cb(progress_report(
                    &latest,
                    plan.total_frames,
                    plan.expected_duration_secs,
                    start.elapsed().as_secs_f64(),
                ));
            }
            if last_progress_wall.elapsed().as_secs() >= 10 {
                tracing::warn!(
                    out_time_secs = latest.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_progress_wall = std::time::Instant::now();
            }
        }

        let status = child
            .wait()
            .map_err(|e| ClipweaveError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            if let Some(cb) = &progress {
                cb(RenderProgress::at_stage(RenderStage::Failed, 0.0, plan.total_frames));
            }
            return Err(ClipweaveError::render(format!(
                "ffmpeg render failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        if let Some(cb) = &progress {
            cb(RenderProgress::at_stage(RenderStage::Complete, 1.0, plan.total_frames));
        }
        Ok(())
    }
}

impl RenderBackend for FfmpegBackend {
    fn render(&mut self, plan: &RenderPlan, progress: Option<ProgressCallback>) -> ClipweaveResult<()> {
        let started = std::time::Instant::now();
        self.run_ffmpeg(plan, progress)?;
        tracing::info!(
            output = %plan.output_path.display(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Render finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Whether `binary` resolves to an executable.
pub fn command_exists(binary: &str) -> bool {
    if binary.contains('/') {
        return Path::new(binary).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    total_frames: u64,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> RenderProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let frames_rendered = (progress * total_frames as f64).round() as u64;
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    RenderProgress {
        progress: if state.complete { 1.0 } else { progress },
        frames_rendered,
        total_frames,
        eta_secs,
        stage: if state.complete {
            RenderStage::Finalizing
        } else {
            RenderStage::Rendering
        },
    }
}
