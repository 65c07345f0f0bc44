#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};
use tower::ServiceExt;

use frameloop_api::config::ServerConfig;
use frameloop_api::router::build_app_router;
use frameloop_api::state::AppState;
use frameloop_pipeline::artifact::MP4_MIME;
use frameloop_pipeline::{
    CapabilityProvider, GenerationJob, PipelineConfig, PipelineError, ProviderChain,
    ProviderError, VideoArtifact,
};

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin and a 30-second request
/// timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: Some(30),
        max_body_bytes: 16 * 1024 * 1024,
        pipeline: PipelineConfig::default(),
    }
}

/// Build the full application router with the given providers, using the
/// same middleware stack production uses.
pub fn build_test_app(providers: Vec<Box<dyn CapabilityProvider>>) -> Router {
    build_test_app_with(test_config(), providers)
}

pub fn build_test_app_with(
    config: ServerConfig,
    providers: Vec<Box<dyn CapabilityProvider>>,
) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        providers: Arc::new(ProviderChain::new(providers, 1)),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: &str,
    body: &'static str,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A small PNG as a browser-style data URL.
pub fn png_data_url() -> String {
    let img = RgbImage::from_pixel(24, 24, Rgb([250, 210, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    frameloop_core::data_url::encode("image/png", &out.into_inner())
}

/// Provider that always returns a fixed mp4 payload.
pub struct StaticVideo;

pub const STATIC_VIDEO: &[u8] = b"static-mp4";

#[async_trait]
impl CapabilityProvider for StaticVideo {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, job: &GenerationJob) -> Result<VideoArtifact, ProviderError> {
        assert!(job.source_path.exists(), "prepared source must exist");
        Ok(VideoArtifact::inline(MP4_MIME, STATIC_VIDEO.to_vec()))
    }
}

/// Provider whose generation always fails hard.
pub struct Broken;

#[async_trait]
impl CapabilityProvider for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, _job: &GenerationJob) -> Result<VideoArtifact, ProviderError> {
        Err(PipelineError::Io(std::io::Error::other("model crashed")).into())
    }
}

/// Provider that is never available.
pub struct Offline;

#[async_trait]
impl CapabilityProvider for Offline {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn generate(&self, _job: &GenerationJob) -> Result<VideoArtifact, ProviderError> {
        Err(ProviderError::Unavailable("offline".to_string()))
    }
}
