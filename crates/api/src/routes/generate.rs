//! Route definitions for video generation.

use axum::routing::post;
use axum::Router;

use crate::handlers::generate;
use crate::state::AppState;

/// ```text
/// POST   /generate-video            -> generate_video
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/generate-video", post(generate::generate_video))
}
