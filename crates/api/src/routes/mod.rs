pub mod catalog;
pub mod generate;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate-video                                  generate (POST)
///
/// /versions                                        animation versions + step tables
/// /quality-profiles                                quality table
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(generate::router())
        .merge(catalog::router())
}
