//! Fallback: the prepared source repeated `frame_count` times.

use async_trait::async_trait;

use frameloop_core::ffmpeg::frame_file_name;

use super::{CapabilityProvider, GenerationJob, ProviderError, PROVIDER_DUPLICATE};
use crate::artifact::{VideoArtifact, MP4_MIME};
use crate::error::PipelineError;
use crate::muxer::{FfmpegMuxer, VideoMuxer};

pub struct DuplicateProvider<X = FfmpegMuxer> {
    muxer: X,
}

impl<X> DuplicateProvider<X> {
    pub fn new(muxer: X) -> Self {
        Self { muxer }
    }
}

impl<X: VideoMuxer> DuplicateProvider<X> {
    async fn render(&self, job: &GenerationJob) -> Result<VideoArtifact, PipelineError> {
        let dir = job.frames_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let mut frames = Vec::with_capacity(job.frame_count());
        for i in 0..job.frame_count() {
            let frame = dir.join(frame_file_name(i));
            tokio::fs::copy(&job.source_path, &frame).await?;
            frames.push(frame);
        }
        job.export_frames(&frames).await?;

        let output = job.output_path();
        self.muxer.mux(&frames, job.fps(), &output).await?;
        VideoArtifact::from_file(&output, MP4_MIME).await
    }
}

#[async_trait]
impl<X: VideoMuxer + 'static> CapabilityProvider for DuplicateProvider<X> {
    fn name(&self) -> &'static str {
        PROVIDER_DUPLICATE
    }

    async fn is_available(&self) -> bool {
        self.muxer.is_available()
    }

    async fn generate(&self, job: &GenerationJob) -> Result<VideoArtifact, ProviderError> {
        if !self.muxer.is_available() {
            return Err(ProviderError::Unavailable("ffmpeg not found on PATH".to_string()));
        }
        Ok(self.render(job).await?)
    }
}
