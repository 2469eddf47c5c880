//! Route definitions for image generation.
//!
//! ```text
//! POST /                                  submit
//! POST /status                            check_status
//! GET  /sessions                          list_sessions (?limit, offset)
//! GET  /sessions/{id}                     get_session
//! POST /{external_task_id}/wait           wait_for_task
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Generation routes, mounted at `/generations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generation::submit))
        .route("/status", post(generation::check_status))
        .route("/sessions", get(generation::list_sessions))
        .route("/sessions/{id}", get(generation::get_session))
}

/// The blocking wait route under `prefix`, kept outside the request timeout.
pub fn wait_router(prefix: &str) -> Router<AppState> {
    Router::new().route(
        &format!("{prefix}/{{external_task_id}}/wait"),
        post(generation::wait_for_task),
    )
}
