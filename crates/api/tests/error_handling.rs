//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no router is
//! involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;

use frameloop_api::error::AppError;
use frameloop_core::error::CoreError;
use frameloop_core::planner::AnimationVersion;
use frameloop_core::scripting::ScriptError;
use frameloop_pipeline::PipelineError;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: AppError::BadRequest maps to 400 with BAD_REQUEST code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_error_returns_400() {
    let (status, json) = error_to_response(AppError::BadRequest("No image provided".into())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "No image provided");
    assert!(json.get("details").is_none());
}

// ---------------------------------------------------------------------------
// Test: CoreError::Validation maps to 400 with VALIDATION_ERROR code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("fps must be between 1 and 60".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "fps must be between 1 and 60");
}

// ---------------------------------------------------------------------------
// Test: CoreError::OutOfRange maps to 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn out_of_range_returns_400() {
    let err = AppError::Core(CoreError::OutOfRange {
        version: AnimationVersion::V1,
        index: 9,
        len: 8,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: pipeline failures map to 500 GENERATION_FAILED with details
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generation_failure_returns_500_with_details() {
    let err = AppError::Pipeline(PipelineError::Provider {
        provider: "diffusion",
        source: Box::new(PipelineError::Step {
            index: 2,
            source: Box::new(
                ScriptError::ExecutionFailed {
                    exit_code: 1,
                    stderr: "CUDA out of memory".into(),
                }
                .into(),
            ),
        }),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "GENERATION_FAILED");
    assert_eq!(json["error"], "Failed to generate video");
    let details = json["details"].as_str().unwrap();
    assert!(details.contains("diffusion"), "details: {details}");
    assert!(details.contains("CUDA out of memory"), "details: {details}");
}

// ---------------------------------------------------------------------------
// Test: no provider maps to 503
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_provider_returns_503() {
    let (status, json) = error_to_response(AppError::Pipeline(PipelineError::NoProvider)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "NO_PROVIDER");
}

// ---------------------------------------------------------------------------
// Test: validation inside the pipeline still maps to 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pipeline_validation_returns_400() {
    let err = AppError::Pipeline(PipelineError::Core(CoreError::Validation(
        "Unknown provider 'teleport'".into(),
    )));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: AppError::InternalError maps to 500 and sanitizes the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("scratch root /secret/path unwritable".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}
