use std::path::PathBuf;
use std::time::Duration;

use frameloop_core::ffmpeg::DEFAULT_VIDEO_QUALITY;
use frameloop_core::planner::OverflowPolicy;
use frameloop_core::scripting::python::DEFAULT_PYTHON;
use frameloop_core::upload::DEFAULT_MAX_UPLOAD_BYTES;

use crate::diffusion::{DEFAULT_GUIDANCE_SCALE, DEFAULT_MODEL_ID};
use crate::providers::DEFAULT_PROVIDER_ORDER;

/// Clip returned by the `sample` provider unless overridden.
pub const DEFAULT_SAMPLE_VIDEO_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";

/// Pipeline configuration loaded from environment variables.
///
/// Shared by the HTTP server and the CLI; the CLI overrides individual
/// fields from its flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root for per-request scratch directories (system temp dir if `None`).
    pub scratch_dir: Option<PathBuf>,
    /// Largest decoded upload accepted, in bytes.
    pub max_upload_bytes: usize,
    /// Python interpreter used to run the diffusion script.
    pub python_bin: PathBuf,
    /// Optional requirements file; when set, a cached venv is built from it.
    pub python_requirements: Option<PathBuf>,
    /// Base directory for cached venvs.
    pub venv_dir: PathBuf,
    /// Path of the img2img step script.
    pub diffusion_script: PathBuf,
    pub model_id: String,
    pub guidance_scale: f64,
    /// Wall-clock limit for a single diffusion step. `None` (the default)
    /// lets steps run as long as they need.
    pub step_timeout: Option<Duration>,
    /// Generator seed for reproducible chains; random when `None`.
    pub seed: Option<u64>,
    /// 1-10 encoder quality knob.
    pub video_quality: u8,
    pub overflow_policy: OverflowPolicy,
    /// Provider names in priority order.
    pub providers: Vec<String>,
    /// URL returned by the `sample` provider; `None` disables it.
    pub sample_video_url: Option<String>,
    /// Maximum concurrent provider runs.
    pub generation_concurrency: usize,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                              |
    /// |-------------------------------|--------------------------------------|
    /// | `SCRATCH_DIR`                 | system temp dir                      |
    /// | `MAX_UPLOAD_BYTES`            | `10485760`                           |
    /// | `PYTHON_BIN`                  | `python3`                            |
    /// | `PYTHON_REQUIREMENTS`         | unset                                |
    /// | `VENV_DIR`                    | `.venvs`                             |
    /// | `DIFFUSION_SCRIPT`            | `scripts/img2img_step.py`            |
    /// | `DIFFUSION_MODEL_ID`          | `runwayml/stable-diffusion-v1-5`     |
    /// | `GUIDANCE_SCALE`              | `7.5`                                |
    /// | `DIFFUSION_STEP_TIMEOUT_SECS` | unset (no limit; `0` also disables)  |
    /// | `DIFFUSION_SEED`              | unset (random)                       |
    /// | `VIDEO_QUALITY`               | `8`                                  |
    /// | `FRAME_OVERFLOW_POLICY`       | `clamp`                              |
    /// | `PROVIDERS`                   | `diffusion,duplicate,zoom,sample,echo` |
    /// | `SAMPLE_VIDEO_URL`            | Big Buck Bunny sample (empty disables) |
    /// | `GENERATION_CONCURRENCY`      | `1`                                  |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let scratch_dir = non_empty_var("SCRATCH_DIR").map(PathBuf::from);

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| defaults.max_upload_bytes.to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let python_bin = non_empty_var("PYTHON_BIN")
            .map(PathBuf::from)
            .unwrap_or(defaults.python_bin);

        let python_requirements = non_empty_var("PYTHON_REQUIREMENTS").map(PathBuf::from);

        let venv_dir = non_empty_var("VENV_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.venv_dir);

        let diffusion_script = non_empty_var("DIFFUSION_SCRIPT")
            .map(PathBuf::from)
            .unwrap_or(defaults.diffusion_script);

        let model_id = non_empty_var("DIFFUSION_MODEL_ID").unwrap_or(defaults.model_id);

        let guidance_scale: f64 = std::env::var("GUIDANCE_SCALE")
            .unwrap_or_else(|_| defaults.guidance_scale.to_string())
            .parse()
            .expect("GUIDANCE_SCALE must be a valid f64");

        let step_timeout = non_empty_var("DIFFUSION_STEP_TIMEOUT_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .expect("DIFFUSION_STEP_TIMEOUT_SECS must be a valid u64")
            })
            .and_then(timeout_from_secs);

        let seed = non_empty_var("DIFFUSION_SEED")
            .map(|v| v.parse::<u64>().expect("DIFFUSION_SEED must be a valid u64"));

        let video_quality: u8 = std::env::var("VIDEO_QUALITY")
            .unwrap_or_else(|_| defaults.video_quality.to_string())
            .parse()
            .expect("VIDEO_QUALITY must be a valid u8");

        let overflow_policy = non_empty_var("FRAME_OVERFLOW_POLICY")
            .map(|label| {
                OverflowPolicy::from_label(&label)
                    .expect("FRAME_OVERFLOW_POLICY must be 'clamp' or 'reject'")
            })
            .unwrap_or_default();

        let providers = non_empty_var("PROVIDERS")
            .map(|list| parse_provider_list(&list))
            .unwrap_or(defaults.providers);

        // Set-but-empty disables the sample provider.
        let sample_video_url = match std::env::var("SAMPLE_VIDEO_URL") {
            Ok(url) if url.trim().is_empty() => None,
            Ok(url) => Some(url.trim().to_string()),
            Err(_) => defaults.sample_video_url,
        };

        let generation_concurrency: usize = std::env::var("GENERATION_CONCURRENCY")
            .unwrap_or_else(|_| defaults.generation_concurrency.to_string())
            .parse()
            .expect("GENERATION_CONCURRENCY must be a valid usize");

        Self {
            scratch_dir,
            max_upload_bytes,
            python_bin,
            python_requirements,
            venv_dir,
            diffusion_script,
            model_id,
            guidance_scale,
            step_timeout,
            seed,
            video_quality,
            overflow_policy,
            providers,
            sample_video_url,
            generation_concurrency: generation_concurrency.max(1),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            python_bin: PathBuf::from(DEFAULT_PYTHON),
            python_requirements: None,
            venv_dir: PathBuf::from(".venvs"),
            diffusion_script: PathBuf::from("scripts/img2img_step.py"),
            model_id: DEFAULT_MODEL_ID.to_string(),
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            step_timeout: None,
            seed: None,
            video_quality: DEFAULT_VIDEO_QUALITY,
            overflow_policy: OverflowPolicy::default(),
            providers: DEFAULT_PROVIDER_ORDER.iter().map(|s| s.to_string()).collect(),
            sample_video_url: Some(DEFAULT_SAMPLE_VIDEO_URL.to_string()),
            generation_concurrency: 1,
        }
    }
}

/// Split a comma-separated provider list, lowercasing and dropping blanks.
pub fn parse_provider_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `0` means no limit.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
