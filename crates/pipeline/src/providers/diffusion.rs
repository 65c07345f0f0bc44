//! The real thing: a diffusion frame chain encoded to mp4.

use async_trait::async_trait;

use frameloop_core::scripting::PythonRuntime;

use super::{CapabilityProvider, GenerationJob, ProviderError, PROVIDER_DIFFUSION};
use crate::artifact::{VideoArtifact, MP4_MIME};
use crate::chain::build_chain;
use crate::config::PipelineConfig;
use crate::diffusion::{DiffusionModel, DiffusionParams, PythonDiffusion};
use crate::muxer::{FfmpegMuxer, VideoMuxer};

pub struct DiffusionProvider<M = PythonDiffusion, X = FfmpegMuxer> {
    model: M,
    muxer: X,
    model_id: String,
    guidance_scale: f64,
    seed: Option<u64>,
}

impl<M, X> DiffusionProvider<M, X> {
    pub fn new(model: M, muxer: X, model_id: impl Into<String>, guidance_scale: f64) -> Self {
        Self {
            model,
            muxer,
            model_id: model_id.into(),
            guidance_scale,
            seed: None,
        }
    }

    /// Seed every chain this provider renders.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

impl DiffusionProvider {
    /// Python-backed provider. A requirements file that fails to install
    /// leaves the base interpreter in place; the dependency check then
    /// decides availability.
    pub async fn from_config(config: &PipelineConfig) -> Self {
        let runtime = match &config.python_requirements {
            Some(requirements) => PythonRuntime::with_requirements(
                &config.python_bin,
                requirements,
                &config.venv_dir,
            )
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(
                    error = %e,
                    requirements = %requirements.display(),
                    "Failed to prepare python venv, using base interpreter"
                );
                PythonRuntime::new(&config.python_bin)
            }),
            None => PythonRuntime::new(&config.python_bin),
        };

        Self::new(
            PythonDiffusion::new(runtime, &config.diffusion_script, config.step_timeout),
            FfmpegMuxer::new(config.video_quality),
            &config.model_id,
            config.guidance_scale,
        )
        .with_seed(config.seed)
    }
}

#[async_trait]
impl<M, X> CapabilityProvider for DiffusionProvider<M, X>
where
    M: DiffusionModel + 'static,
    X: VideoMuxer + 'static,
{
    fn name(&self) -> &'static str {
        PROVIDER_DIFFUSION
    }

    async fn is_available(&self) -> bool {
        self.muxer.is_available() && self.model.is_ready().await
    }

    async fn generate(&self, job: &GenerationJob) -> Result<VideoArtifact, ProviderError> {
        if !self.muxer.is_available() {
            return Err(ProviderError::Unavailable("ffmpeg not found on PATH".to_string()));
        }
        if !self.model.is_ready().await {
            return Err(ProviderError::Unavailable(
                "diffusion dependencies not installed".to_string(),
            ));
        }

        let params = DiffusionParams::new(&self.model_id, self.guidance_scale, &job.profile)
            .with_seed(self.seed);
        let chain = build_chain(
            &self.model,
            &job.source_path,
            job.request.version,
            job.frame_count(),
            &params,
            &job.frames_dir(),
        )
        .await?;
        job.export_frames(chain.frames()).await?;

        let output = job.output_path();
        self.muxer.mux(chain.frames(), job.fps(), &output).await?;
        Ok(VideoArtifact::from_file(&output, MP4_MIME).await?)
    }
}
