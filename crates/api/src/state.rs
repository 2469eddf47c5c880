use std::sync::Arc;

use forge_pipeline::GenerationOrchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Submission, status, and polling entry point.
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub config: Arc<ServerConfig>,
}
