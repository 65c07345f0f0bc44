use std::sync::Arc;

use frameloop_pipeline::ProviderChain;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). Nothing in here is
/// mutated per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Generation providers in priority order.
    pub providers: Arc<ProviderChain>,
}
