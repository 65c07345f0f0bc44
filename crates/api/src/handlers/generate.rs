//! Handler for `POST /generate-video`.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use frameloop_core::request::{AnimationRequest, RequestParams};
use frameloop_core::upload::SourceImage;
use frameloop_pipeline::GenerationJob;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body. `image` is a `data:` URL (or bare base64); the remaining
/// fields are optional and defaulted during validation.
#[derive(Debug, Deserialize)]
pub struct GenerateVideoRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(flatten)]
    pub params: RequestParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    pub success: bool,
    /// `data:video/mp4;base64,...`, a data URL of the echoed upload, or an
    /// external URL, depending on the provider.
    pub video_url: String,
    pub provider: &'static str,
    /// Frames rendered into the video; `null` when the provider does not
    /// render frames.
    pub frames: Option<usize>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /generate-video
///
/// Validate the upload and parameters, then run the provider chain. The
/// job's scratch directory is removed when the handler returns, on every
/// path.
pub async fn generate_video(
    State(state): State<AppState>,
    AppJson(input): AppJson<GenerateVideoRequest>,
) -> AppResult<Json<GenerateVideoResponse>> {
    let image = input
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("No image provided".to_string()))?;

    let pipeline = &state.config.pipeline;
    let source = SourceImage::from_data_url(image, pipeline.max_upload_bytes)?;
    let request = AnimationRequest::accept(source, &input.params, pipeline.overflow_policy)?;

    tracing::info!(
        version = %request.version,
        frames = request.frame_count,
        requested_frames = request.requested_frames,
        fps = request.fps,
        quality = %request.quality,
        "Accepted generation request"
    );

    let job = GenerationJob::prepare(request, pipeline.scratch_dir.as_deref()).await?;
    let generated = state.providers.generate(&job).await?;

    tracing::info!(
        job_id = %job.id,
        provider = generated.provider,
        frames = ?generated.frames,
        "Generation finished"
    );

    Ok(Json(GenerateVideoResponse {
        success: true,
        video_url: generated.artifact.url(),
        provider: generated.provider,
        frames: generated.frames,
    }))
}
