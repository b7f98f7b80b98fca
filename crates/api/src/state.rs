use std::sync::Arc;

use vitals_pipeline::VitalsService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything lives behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Ingest, read, and queue introspection operations.
    pub service: Arc<VitalsService>,
    pub config: Arc<ServerConfig>,
}
