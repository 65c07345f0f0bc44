use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use frameloop_core::error::CoreError;
use frameloop_pipeline::PipelineError;
use serde_json::json;

/// Message clients see for any generation failure; the cause goes in
/// `details`.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate video";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`PipelineError`] and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `frameloop_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A generation error from `frameloop_pipeline`.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The body was not JSON, or did not fit the handler's input type.
    #[error(transparent)]
    InvalidBody(#[from] JsonRejection),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => classify_core_error(core),

            // --- Pipeline errors ---
            AppError::Pipeline(err) => classify_pipeline_error(err),

            // --- HTTP-specific errors ---
            AppError::InvalidBody(rejection) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "Invalid request body".to_string(),
                Some(rejection.body_text()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, axum::Json(body)).into_response()
    }
}

type Classified = (StatusCode, &'static str, String, Option<String>);

fn classify_core_error(err: &CoreError) -> Classified {
    match err {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None),
        CoreError::OutOfRange { .. } => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            err.to_string(),
            None,
        ),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}

/// Map a pipeline failure.
///
/// - Request problems surfacing from the pipeline map to 400.
/// - No usable provider maps to 503.
/// - Everything else is a generation failure (500) with the cause in `details`.
fn classify_pipeline_error(err: &PipelineError) -> Classified {
    match err {
        PipelineError::Core(core) => classify_core_error(core),
        PipelineError::NoProvider => (
            StatusCode::SERVICE_UNAVAILABLE,
            "NO_PROVIDER",
            err.to_string(),
            None,
        ),
        err if err.is_validation() => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            err.to_string(),
            None,
        ),
        err => {
            tracing::error!(error = %err, "Video generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "GENERATION_FAILED",
                GENERATION_FAILED_MESSAGE.to_string(),
                Some(err.to_string()),
            )
        }
    }
}
