//! Image-to-image diffusion seam.
//!
//! [`DiffusionModel`] loads a model for one chain and hands back a
//! [`DiffusionSession`]; each session call performs one conditioned pass:
//! read an image, move it towards a prompt by `strength`, write the result.
//! [`PythonDiffusion`] keeps one `img2img_step.py` worker alive per session,
//! so the weights load once per chain rather than once per step.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use frameloop_core::planner::FrameStep;
use frameloop_core::quality::QualityProfile;
use frameloop_core::scripting::{PythonRuntime, ScriptError, ScriptInput, ScriptWorker};

use crate::error::PipelineError;

/// Pretrained model used unless configured otherwise.
pub const DEFAULT_MODEL_ID: &str = "runwayml/stable-diffusion-v1-5";

/// Classifier-free guidance scale used unless configured otherwise.
pub const DEFAULT_GUIDANCE_SCALE: f64 = 7.5;

/// Argument that makes the script only verify its imports.
const CHECK_ARG: &str = "--check";

/// Importing torch and diffusers can be slow on a cold cache.
const CHECK_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings that stay fixed across every step of one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffusionParams {
    pub model_id: String,
    pub guidance_scale: f64,
    pub inference_steps: u32,
    pub width: u32,
    pub height: u32,
    /// Generator seed applied to every step; unseeded runs differ each time.
    pub seed: Option<u64>,
}

impl DiffusionParams {
    pub fn new(model_id: impl Into<String>, guidance_scale: f64, profile: &QualityProfile) -> Self {
        let (width, height) = profile.aligned_dimensions();
        Self {
            model_id: model_id.into(),
            guidance_scale,
            inference_steps: profile.inference_steps,
            width,
            height,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// The full request for one step.
    pub fn request(&self, step: &FrameStep, input: &Path, output: &Path) -> Img2ImgRequest {
        Img2ImgRequest {
            model_id: self.model_id.clone(),
            input_path: input.to_path_buf(),
            output_path: output.to_path_buf(),
            prompt: step.prompt.to_string(),
            negative_prompt: step.negative_prompt.to_string(),
            strength: step.strength,
            steps: self.inference_steps,
            guidance: self.guidance_scale,
            width: self.width,
            height: self.height,
            seed: self.seed,
        }
    }
}

/// One img2img pass. Serialized as one JSON line to the step worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Img2ImgRequest {
    pub model_id: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub prompt: String,
    pub negative_prompt: String,
    pub strength: f64,
    pub steps: u32,
    pub guidance: f64,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
}

/// A pretrained image-to-image model.
pub trait DiffusionModel: Send + Sync {
    type Session: DiffusionSession;

    /// Whether the model can run in this environment.
    fn is_ready(&self) -> impl Future<Output = bool> + Send;

    /// Load the model for one chain.
    fn open_session(&self) -> impl Future<Output = Result<Self::Session, PipelineError>> + Send;
}

/// A loaded model serving the steps of one chain, in order.
///
/// Dropping a session without [`close`](Self::close) releases it abruptly.
pub trait DiffusionSession: Send {
    /// Run one pass, writing the result to `request.output_path`.
    fn img2img(
        &mut self,
        request: &Img2ImgRequest,
    ) -> impl Future<Output = Result<(), PipelineError>> + Send;

    fn close(self) -> impl Future<Output = ()> + Send;
}

/// One line from the step worker.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepReply {
    Done { output_path: PathBuf },
    Failed { error: String },
}

/// Runs the diffusion step script on a Python runtime.
#[derive(Debug)]
pub struct PythonDiffusion {
    runtime: PythonRuntime,
    script: PathBuf,
    step_timeout: Option<Duration>,
    /// Result of the `--check` run, computed once per process.
    ready: OnceCell<bool>,
}

impl PythonDiffusion {
    /// `step_timeout` of `None` lets every step run to completion.
    pub fn new(runtime: PythonRuntime, script: impl Into<PathBuf>, step_timeout: Option<Duration>) -> Self {
        Self {
            runtime,
            script: script.into(),
            step_timeout,
            ready: OnceCell::new(),
        }
    }

    async fn check_dependencies(&self) -> bool {
        if !self.runtime.is_available() {
            tracing::info!(
                interpreter = %self.runtime.interpreter().display(),
                "Python interpreter not found, diffusion disabled"
            );
            return false;
        }
        if !self.script.exists() {
            tracing::info!(script = %self.script.display(), "Diffusion script not found");
            return false;
        }

        let input = ScriptInput::new(serde_json::Value::Null, CHECK_TIMEOUT).with_arg(CHECK_ARG);
        match self.runtime.run(&self.script, input).await {
            Ok(output) if output.success() => {
                tracing::info!(duration_ms = output.duration_ms, "Diffusion dependencies available");
                true
            }
            Ok(output) => {
                tracing::info!(
                    exit_code = output.exit_code,
                    stderr = %output.stderr.trim(),
                    "Diffusion dependency check failed"
                );
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Diffusion dependency check could not run");
                false
            }
        }
    }
}

impl DiffusionModel for PythonDiffusion {
    type Session = PythonSession;

    async fn is_ready(&self) -> bool {
        *self.ready.get_or_init(|| self.check_dependencies()).await
    }

    async fn open_session(&self) -> Result<PythonSession, PipelineError> {
        let worker = self.runtime.spawn_worker(&self.script).await?;
        tracing::debug!(script = %self.script.display(), "Diffusion worker started");
        Ok(PythonSession {
            worker,
            step_timeout: self.step_timeout,
        })
    }
}

/// A step worker process; the model stays loaded in it between steps.
pub struct PythonSession {
    worker: ScriptWorker,
    step_timeout: Option<Duration>,
}

impl DiffusionSession for PythonSession {
    async fn img2img(&mut self, request: &Img2ImgRequest) -> Result<(), PipelineError> {
        let start = Instant::now();
        let reply: StepReply = self.worker.request(request, self.step_timeout).await?;

        let output_path = match reply {
            StepReply::Done { output_path } => output_path,
            StepReply::Failed { error } => return Err(ScriptError::Reported(error).into()),
        };
        if output_path != request.output_path {
            return Err(ScriptError::InvalidOutput(format!(
                "wrote {} instead of {}",
                output_path.display(),
                request.output_path.display()
            ))
            .into());
        }
        if !output_path.exists() {
            return Err(ScriptError::InvalidOutput(format!(
                "reported output {} does not exist",
                output_path.display()
            ))
            .into());
        }

        tracing::debug!(
            output = %output_path.display(),
            duration_ms = start.elapsed().as_millis() as u64,
            "img2img step finished"
        );
        Ok(())
    }

    async fn close(self) {
        self.worker.shutdown().await;
    }
}
