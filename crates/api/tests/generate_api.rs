//! Integration tests for `POST /api/v1/generate-video` and the catalogs.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{body_json, get, png_data_url, post_json, post_raw, Broken, Offline, StaticVideo};
use frameloop_pipeline::providers::{EchoProvider, SampleProvider};

const GENERATE: &str = "/api/v1/generate-video";

// ---------------------------------------------------------------------------
// Missing or malformed uploads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_image_returns_400() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_json(app, GENERATE, json!({ "version": "version1" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No image provided");
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn blank_image_returns_400() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_json(app, GENERATE, json!({ "image": "   " })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn non_image_payload_returns_400() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_json(
        app,
        GENERATE,
        json!({ "image": "data:image/png;base64,aGVsbG8gd29ybGQ=" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn oversized_upload_returns_400() {
    let mut config = common::test_config();
    config.pipeline.max_upload_bytes = 64;
    let app = common::build_test_app_with(config, vec![Box::new(StaticVideo)]);

    let response = post_json(app, GENERATE, json!({ "image": png_data_url() })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().contains("upload limit"));
}

#[tokio::test]
async fn mistyped_field_returns_json_400() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_json(
        app,
        GENERATE,
        json!({ "image": png_data_url(), "frames": -1 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "Invalid request body");
    assert!(json["details"].as_str().unwrap().contains("-1"));
}

#[tokio::test]
async fn malformed_json_returns_json_400() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_raw(app, GENERATE, "application/json", "{\"image\": ").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["details"].is_string());
}

#[tokio::test]
async fn non_json_content_type_returns_json_400() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_raw(app, GENERATE, "text/plain", "image=abc").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Parameter validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_version_returns_400() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_json(
        app,
        GENERATE,
        json!({ "image": png_data_url(), "version": "version3" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn out_of_range_fps_returns_400() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_json(app, GENERATE, json!({ "image": png_data_url(), "fps": 0 })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn overlong_request_is_clamped_to_table() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_json(
        app,
        GENERATE,
        json!({ "image": png_data_url(), "version": "version1", "frames": 30 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["frames"], 9);
}

#[tokio::test]
async fn overlong_request_rejected_under_reject_policy() {
    let mut config = common::test_config();
    config.pipeline.overflow_policy = frameloop_core::planner::OverflowPolicy::Reject;
    let app = common::build_test_app_with(config, vec![Box::new(StaticVideo)]);

    let response = post_json(
        app,
        GENERATE,
        json!({ "image": png_data_url(), "version": "version2", "frames": 30 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_returns_mp4_data_url() {
    let app = common::build_test_app(vec![Box::new(Offline), Box::new(StaticVideo)]);
    let response = post_json(
        app,
        GENERATE,
        json!({
            "image": png_data_url(),
            "version": "version2",
            "frames": 6,
            "fps": 12,
            "quality": "fast"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["provider"], "static");
    assert_eq!(json["frames"], 6);
    assert_eq!(json["videoUrl"], "data:video/mp4;base64,c3RhdGljLW1wNA==");
}

#[tokio::test]
async fn defaults_apply_when_fields_missing() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = post_json(app, GENERATE, json!({ "image": png_data_url() })).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["frames"], 8);
}

#[tokio::test]
async fn echo_returns_upload_without_frame_count() {
    let app = common::build_test_app(vec![Box::new(EchoProvider)]);
    let image = png_data_url();
    let response = post_json(app, GENERATE, json!({ "image": image })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["provider"], "echo");
    assert_eq!(json["videoUrl"], image);
    assert!(json["frames"].is_null());
}

#[tokio::test]
async fn sample_returns_external_url() {
    let app = common::build_test_app(vec![Box::new(SampleProvider::new(Some(
        "https://example.com/sample.mp4".to_string(),
    )))]);
    let response = post_json(app, GENERATE, json!({ "image": png_data_url() })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["provider"], "sample");
    assert_eq!(json["videoUrl"], "https://example.com/sample.mp4");
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn provider_failure_returns_500_and_is_not_masked() {
    let app = common::build_test_app(vec![Box::new(Broken), Box::new(EchoProvider)]);
    let response = post_json(app, GENERATE, json!({ "image": png_data_url() })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to generate video");
    assert_eq!(json["code"], "GENERATION_FAILED");
    assert!(json["details"].as_str().unwrap().contains("model crashed"));
}

#[tokio::test]
async fn failed_request_leaves_no_scratch_dirs() {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = common::test_config();
    config.pipeline.scratch_dir = Some(scratch.path().to_path_buf());
    let app = common::build_test_app_with(config, vec![Box::new(Broken)]);

    let response = post_json(app, GENERATE, json!({ "image": png_data_url() })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let leftovers: Vec<_> = std::fs::read_dir(scratch.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "scratch root not empty: {leftovers:?}");
}

#[tokio::test]
async fn successful_request_leaves_no_scratch_dirs() {
    let scratch = tempfile::tempdir().unwrap();
    let mut config = common::test_config();
    config.pipeline.scratch_dir = Some(scratch.path().to_path_buf());
    let app = common::build_test_app_with(config, vec![Box::new(StaticVideo)]);

    let response = post_json(app, GENERATE, json!({ "image": png_data_url() })).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn no_available_provider_returns_503() {
    let app = common::build_test_app(vec![Box::new(Offline)]);
    let response = post_json(app, GENERATE, json!({ "image": png_data_url() })).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "NO_PROVIDER");
}

// ---------------------------------------------------------------------------
// Catalogs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn versions_lists_step_tables() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = get(app, "/api/v1/versions").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let versions = json["data"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["name"], "version1");
    assert_eq!(versions[0]["max_frames"], 9);
    assert_eq!(versions[0]["steps"].as_array().unwrap().len(), 8);
    assert_eq!(versions[0]["steps"][0]["index"], 1);
    assert_eq!(versions[0]["steps"][0]["strength"], 0.6);
    assert_eq!(versions[1]["name"], "version2");
    assert_eq!(versions[1]["steps"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn quality_profiles_lists_table() {
    let app = common::build_test_app(vec![Box::new(StaticVideo)]);
    let response = get(app, "/api/v1/quality-profiles").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let profiles = json["data"].as_array().unwrap();
    assert_eq!(profiles.len(), 3);
    assert_eq!(profiles[1]["tier"], "balanced");
    assert_eq!(profiles[1]["width"], 512);
    assert_eq!(profiles[1]["inference_steps"], 20);
}
