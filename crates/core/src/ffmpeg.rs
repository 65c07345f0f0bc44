//! FFmpeg/FFprobe command utilities.
//!
//! Encoding an ordered PNG sequence into an H.264 mp4, rendering the zoom
//! fallback from a single still, and probing a finished container.

use std::path::Path;

use serde::Deserialize;
use tokio::process::Command;

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("input not found: {0}")]
    InputNotFound(String),
}

/// Input file pattern for image sequences. Frame files must be numbered
/// from zero without gaps.
pub const FRAME_PATTERN: &str = "frame_%04d.png";

/// Video quality used when none is configured (1-10 scale).
pub const DEFAULT_VIDEO_QUALITY: u8 = 8;

/// Base CRF the quality knob is subtracted from.
const CRF_BASE: u8 = 23;

/// File name of frame `index` under [`FRAME_PATTERN`].
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:04}.png")
}

/// Map the 1-10 quality knob onto an x264 CRF (higher quality, lower CRF).
/// Out-of-range values are clamped.
pub fn quality_to_crf(quality: u8) -> u8 {
    CRF_BASE - quality.clamp(1, 10)
}

/// Whether both `ffmpeg` and `ffprobe` are on `PATH`.
pub fn is_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeStream {
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// e.g. "8/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
pub async fn inspect_video(path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    ensure_exists(path)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))
}

/// Encode `frame_dir/frame_%04d.png` into an H.264 mp4 at a uniform `fps`.
pub async fn encode_image_sequence(
    frame_dir: &Path,
    fps: u32,
    crf: u8,
    output_path: &Path,
) -> Result<(), FfmpegError> {
    let first = frame_dir.join(frame_file_name(0));
    ensure_exists(&first)?;

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-loglevel", "error", "-framerate", &fps.to_string(), "-i"])
        .arg(frame_dir.join(FRAME_PATTERN))
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf", &crf.to_string()])
        .arg(output_path);
    run_ffmpeg(cmd).await
}

/// Render a slow zoom-in over a single still image.
///
/// Produces exactly `frames` frames of `width`x`height` at `fps`.
pub async fn render_zoom(
    image_path: &Path,
    frames: usize,
    fps: u32,
    (width, height): (u32, u32),
    crf: u8,
    output_path: &Path,
) -> Result<(), FfmpegError> {
    ensure_exists(image_path)?;

    let filter = zoom_filter(frames, fps, width, height);
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-loglevel", "error", "-loop", "1", "-i"])
        .arg(image_path)
        .args(["-vf", &filter, "-frames:v", &frames.to_string()])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf", &crf.to_string()])
        .arg(output_path);
    run_ffmpeg(cmd).await
}

/// `zoompan` expression zooming from 1.0 towards 1.5, centered.
fn zoom_filter(frames: usize, fps: u32, width: u32, height: u32) -> String {
    format!(
        "zoompan=z='min(zoom+0.0015,1.5)':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d={frames}:s={width}x{height}:fps={fps}"
    )
}

async fn run_ffmpeg(mut cmd: Command) -> Result<(), FfmpegError> {
    let output = cmd.output().await.map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

fn ensure_exists(path: &Path) -> Result<(), FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::InputNotFound(
            path.to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(info: &FfprobeOutput) -> Option<&FfprobeStream> {
    info
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(info: &FfprobeOutput) -> f64 {
    info
        .format
        .duration
        .as_deref()
        .or_else(|| first_video_stream(info).and_then(|s| s.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Parse the video framerate from ffprobe output.
///
/// The `r_frame_rate` field is a fraction like `"8/1"` or `"24000/1001"`.
pub fn parse_framerate(info: &FfprobeOutput) -> f64 {
    first_video_stream(info)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(0.0)
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    if let Some((num, den)) = s.split_once('/') {
        let num = num.parse::<f64>().unwrap_or(0.0);
        let den = den.parse::<f64>().unwrap_or(1.0);
        return if den > 0.0 { num / den } else { 0.0 };
    }
    s.parse::<f64>().unwrap_or(0.0)
}

/// Count total frames from ffprobe output, estimating from duration and
/// framerate when the container does not record `nb_frames`.
pub fn parse_total_frames(info: &FfprobeOutput) -> i64 {
    if let Some(n) = first_video_stream(info)
        .and_then(|s| s.nb_frames.as_deref())
        .and_then(|nb| nb.parse::<i64>().ok())
    {
        return n;
    }
    let duration = parse_duration(info);
    let fps = parse_framerate(info);
    if duration > 0.0 && fps > 0.0 {
        return (duration * fps).round() as i64;
    }
    0
}

/// Find the first video stream's resolution.
pub fn parse_resolution(info: &FfprobeOutput) -> (i32, i32) {
    first_video_stream(info)
        .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
        .unwrap_or((0, 0))
}
