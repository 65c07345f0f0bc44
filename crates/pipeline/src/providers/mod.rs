//! Capability providers.
//!
//! Each provider is one strategy for turning a [`GenerationJob`] into a
//! [`VideoArtifact`]. The [`ProviderChain`] tries them in configured order:
//! a provider reporting [`ProviderError::Unavailable`] is skipped, any other
//! failure ends the request. A diffusion failure is never papered over by a
//! cheaper fallback.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Semaphore;
use uuid::Uuid;

use frameloop_core::error::CoreError;
use frameloop_core::quality::QualityProfile;
use frameloop_core::request::AnimationRequest;
use frameloop_core::upload::PreparedSource;

use crate::artifact::VideoArtifact;
use crate::chain::export_frames;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::muxer::FfmpegMuxer;
use crate::scratch::ScratchDir;

pub mod diffusion;
pub mod duplicate;
pub mod echo;
pub mod sample;
pub mod zoom;

pub use diffusion::DiffusionProvider;
pub use duplicate::DuplicateProvider;
pub use echo::EchoProvider;
pub use sample::SampleProvider;
pub use zoom::ZoomProvider;

/* --------------------------------------------------------------------------
Named constants
-------------------------------------------------------------------------- */

pub const PROVIDER_DIFFUSION: &str = "diffusion";
pub const PROVIDER_DUPLICATE: &str = "duplicate";
pub const PROVIDER_ZOOM: &str = "zoom";
pub const PROVIDER_SAMPLE: &str = "sample";
pub const PROVIDER_ECHO: &str = "echo";

/// Provider priority used when none is configured.
pub const DEFAULT_PROVIDER_ORDER: &[&str] = &[
    PROVIDER_DIFFUSION,
    PROVIDER_DUPLICATE,
    PROVIDER_ZOOM,
    PROVIDER_SAMPLE,
    PROVIDER_ECHO,
];

/// Prepared source file name inside the scratch directory.
pub const SOURCE_FILE: &str = "input.png";

/// Encoded video file name inside the scratch directory.
pub const OUTPUT_FILE: &str = "output.mp4";

/// Frame directory name inside the scratch directory.
pub const FRAMES_DIR: &str = "frames";

/* --------------------------------------------------------------------------
Job
-------------------------------------------------------------------------- */

/// Everything one request needs, owned by that request alone.
///
/// Dropping the job removes its scratch directory.
#[derive(Debug)]
pub struct GenerationJob {
    pub id: Uuid,
    pub request: AnimationRequest,
    pub profile: QualityProfile,
    /// The prepared (RGB, resized) source PNG.
    pub source_path: PathBuf,
    pub prepared: PreparedSource,
    pub scratch: ScratchDir,
    /// When set, intermediate frames are copied here before encoding.
    pub save_frames: Option<PathBuf>,
}

impl GenerationJob {
    /// Create the scratch directory and write the prepared source into it.
    pub async fn prepare(
        request: AnimationRequest,
        scratch_root: Option<&Path>,
    ) -> Result<Self, PipelineError> {
        let scratch = ScratchDir::create(scratch_root)?;
        let profile = request.profile();
        let source_path = scratch.join(SOURCE_FILE);
        let prepared = request.source.write_prepared(&profile, &source_path).await?;

        let id = Uuid::new_v4();
        tracing::debug!(
            job_id = %id,
            version = %request.version,
            frames = request.frame_count,
            width = prepared.width,
            height = prepared.height,
            "Prepared generation job"
        );

        Ok(Self {
            id,
            request,
            profile,
            source_path,
            prepared,
            scratch,
            save_frames: None,
        })
    }

    pub fn with_saved_frames(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_frames = Some(dir.into());
        self
    }

    pub fn frame_count(&self) -> usize {
        self.request.frame_count
    }

    pub fn fps(&self) -> u32 {
        self.request.fps
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.scratch.join(FRAMES_DIR)
    }

    pub fn output_path(&self) -> PathBuf {
        self.scratch.join(OUTPUT_FILE)
    }

    /// Copy frames out if the caller asked for them.
    pub async fn export_frames(&self, frames: &[PathBuf]) -> Result<(), PipelineError> {
        if let Some(dest) = &self.save_frames {
            export_frames(frames, dest).await?;
        }
        Ok(())
    }
}

/* --------------------------------------------------------------------------
Provider trait
-------------------------------------------------------------------------- */

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The environment lacks this capability; try the next provider.
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Failed(#[from] PipelineError),
}

#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap readiness check used for skipping and for `/health`.
    async fn is_available(&self) -> bool;

    async fn generate(&self, job: &GenerationJob) -> Result<VideoArtifact, ProviderError>;

    /// Whether the artifact contains `job.frame_count()` rendered frames.
    fn produces_frames(&self) -> bool {
        true
    }
}

/* --------------------------------------------------------------------------
Chain
-------------------------------------------------------------------------- */

/// Successful generation.
#[derive(Debug, Clone)]
pub struct Generated {
    pub provider: &'static str,
    pub artifact: VideoArtifact,
    /// Rendered frame count, `None` for providers that do not render.
    pub frames: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: &'static str,
    pub available: bool,
}

/// Providers in priority order, with a bound on concurrent runs.
pub struct ProviderChain {
    providers: Vec<Box<dyn CapabilityProvider>>,
    permits: Semaphore,
}

impl fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.names())
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn CapabilityProvider>>, concurrency: usize) -> Self {
        Self {
            providers,
            permits: Semaphore::new(concurrency.max(1)),
        }
    }

    /// Build the providers named in `config.providers`, in order.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let mut providers: Vec<Box<dyn CapabilityProvider>> = Vec::new();
        for name in &config.providers {
            let provider: Box<dyn CapabilityProvider> = match name.as_str() {
                PROVIDER_DIFFUSION => Box::new(DiffusionProvider::from_config(config).await),
                PROVIDER_DUPLICATE => {
                    Box::new(DuplicateProvider::new(FfmpegMuxer::new(config.video_quality)))
                }
                PROVIDER_ZOOM => Box::new(ZoomProvider::new(config.video_quality)),
                PROVIDER_SAMPLE => Box::new(SampleProvider::new(config.sample_video_url.clone())),
                PROVIDER_ECHO => Box::new(EchoProvider),
                other => {
                    return Err(CoreError::Validation(format!(
                        "Unknown provider '{other}'. Must be one of: {}",
                        DEFAULT_PROVIDER_ORDER.join(", ")
                    ))
                    .into())
                }
            };
            providers.push(provider);
        }

        tracing::info!(providers = ?config.providers, "Provider chain configured");
        Ok(Self::new(providers, config.generation_concurrency))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn availability(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            statuses.push(ProviderStatus {
                name: provider.name(),
                available: provider.is_available().await,
            });
        }
        statuses
    }

    /// Run the first available provider.
    pub async fn generate(&self, job: &GenerationJob) -> Result<Generated, PipelineError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CoreError::Internal("generation semaphore closed".to_string()))?;

        for provider in &self.providers {
            let name = provider.name();
            if !provider.is_available().await {
                tracing::debug!(job_id = %job.id, provider = name, "Provider unavailable, skipping");
                continue;
            }

            tracing::info!(job_id = %job.id, provider = name, "Generating video");
            match provider.generate(job).await {
                Ok(artifact) => {
                    return Ok(Generated {
                        provider: name,
                        artifact,
                        frames: provider.produces_frames().then(|| job.frame_count()),
                    });
                }
                Err(ProviderError::Unavailable(reason)) => {
                    tracing::info!(job_id = %job.id, provider = name, %reason, "Provider unavailable, trying next");
                }
                Err(ProviderError::Failed(source)) => {
                    tracing::error!(job_id = %job.id, provider = name, error = %source, "Provider failed");
                    return Err(PipelineError::Provider {
                        provider: name,
                        source: Box::new(source),
                    });
                }
            }
        }

        tracing::warn!(job_id = %job.id, "No provider could handle the job");
        Err(PipelineError::NoProvider)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
