//! Frame sequence to video encoding.

use std::future::Future;
use std::path::{Path, PathBuf};

use frameloop_core::error::CoreError;
use frameloop_core::ffmpeg;

use crate::error::PipelineError;

/// Encodes an ordered list of frames into a video container.
pub trait VideoMuxer: Send + Sync {
    fn is_available(&self) -> bool;

    /// Encode `frames` in the given order at a uniform `fps`.
    fn mux(
        &self,
        frames: &[PathBuf],
        fps: u32,
        output: &Path,
    ) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

/// H.264/mp4 muxer backed by the `ffmpeg` CLI.
#[derive(Debug, Clone, Copy)]
pub struct FfmpegMuxer {
    crf: u8,
}

impl FfmpegMuxer {
    /// `video_quality` is the 1-10 knob mapped onto x264 CRF.
    pub fn new(video_quality: u8) -> Self {
        Self {
            crf: ffmpeg::quality_to_crf(video_quality),
        }
    }

    pub fn crf(&self) -> u8 {
        self.crf
    }
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new(ffmpeg::DEFAULT_VIDEO_QUALITY)
    }
}

impl VideoMuxer for FfmpegMuxer {
    fn is_available(&self) -> bool {
        ffmpeg::is_available()
    }

    async fn mux(&self, frames: &[PathBuf], fps: u32, output: &Path) -> Result<(), PipelineError> {
        if frames.is_empty() {
            return Err(CoreError::Validation("No frames to encode".to_string()).into());
        }

        if let Some(dir) = sequence_dir(frames) {
            ffmpeg::encode_image_sequence(dir, fps, self.crf, output).await?;
        } else {
            // Frames are scattered or misnamed; copy them into pattern order.
            let parent = output
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let staging = tempfile::Builder::new().prefix("mux_").tempdir_in(parent)?;
            for (i, frame) in frames.iter().enumerate() {
                tokio::fs::copy(frame, staging.path().join(ffmpeg::frame_file_name(i))).await?;
            }
            ffmpeg::encode_image_sequence(staging.path(), fps, self.crf, output).await?;
        }

        tracing::info!(
            frames = frames.len(),
            fps,
            crf = self.crf,
            output = %output.display(),
            "Encoded video"
        );
        Ok(())
    }
}

/// The shared directory if `frames` already are `frame_0000.png`,
/// `frame_0001.png`, ... in one directory.
fn sequence_dir(frames: &[PathBuf]) -> Option<&Path> {
    let dir = frames.first()?.parent()?;
    let in_pattern = frames.iter().enumerate().all(|(i, frame)| {
        frame.parent() == Some(dir)
            && frame.file_name().and_then(|n| n.to_str())
                == Some(ffmpeg::frame_file_name(i).as_str())
    });
    in_pattern.then_some(dir)
}
