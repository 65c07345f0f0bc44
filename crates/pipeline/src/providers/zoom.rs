//! Fallback: a slow zoom-in over the prepared source.

use async_trait::async_trait;

use frameloop_core::ffmpeg;

use super::{CapabilityProvider, GenerationJob, ProviderError, PROVIDER_ZOOM};
use crate::artifact::{VideoArtifact, MP4_MIME};
use crate::error::PipelineError;

pub struct ZoomProvider {
    crf: u8,
}

impl ZoomProvider {
    pub fn new(video_quality: u8) -> Self {
        Self {
            crf: ffmpeg::quality_to_crf(video_quality),
        }
    }

    async fn render(&self, job: &GenerationJob) -> Result<VideoArtifact, PipelineError> {
        let output = job.output_path();
        ffmpeg::render_zoom(
            &job.source_path,
            job.frame_count(),
            job.fps(),
            (job.prepared.width, job.prepared.height),
            self.crf,
            &output,
        )
        .await?;
        VideoArtifact::from_file(&output, MP4_MIME).await
    }
}

#[async_trait]
impl CapabilityProvider for ZoomProvider {
    fn name(&self) -> &'static str {
        PROVIDER_ZOOM
    }

    async fn is_available(&self) -> bool {
        ffmpeg::is_available()
    }

    async fn generate(&self, job: &GenerationJob) -> Result<VideoArtifact, ProviderError> {
        if !ffmpeg::is_available() {
            return Err(ProviderError::Unavailable("ffmpeg not found on PATH".to_string()));
        }
        Ok(self.render(job).await?)
    }
}
