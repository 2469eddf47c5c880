pub mod generation;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generations                                     submit fan-out (POST)
/// /generations/status                              batch status check (POST)
/// /generations/sessions                            list own sessions
/// /generations/sessions/{id}                       session with its tasks
/// /generations/{external_task_id}/wait             blocking poll (no request timeout)
/// ```
///
/// Every route requires a Bearer token. The wait route is mounted separately
/// by [`crate::router::build_app_router`].
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/generations", generation::router())
}
