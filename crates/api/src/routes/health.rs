use axum::extract::State;
use axum::{routing::get, Json, Router};
use frameloop_pipeline::providers::ProviderStatus;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Configured providers in priority order, with availability.
    pub providers: Vec<ProviderStatus>,
}

/// GET /health -- returns service status and provider availability.
///
/// `degraded` means no provider can currently serve a request.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers = state.providers.availability().await;

    let status = if providers.iter().any(|p| p.available) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        providers,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
