//! Route definitions for the read-only catalogs.

use axum::routing::get;
use axum::Router;

use crate::handlers::catalog;
use crate::state::AppState;

/// ```text
/// GET    /versions                  -> list_versions
/// GET    /quality-profiles          -> list_quality_profiles
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/versions", get(catalog::list_versions))
        .route("/quality-profiles", get(catalog::list_quality_profiles))
}
