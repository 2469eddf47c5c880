//! Handlers for multi-provider image generation.
//!
//! Submission fans a prompt out to several providers, status checks
//! reconcile provider state into the task store (materializing results on
//! first success), and the wait endpoint blocks until one task settles.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use forge_core::error::CoreError;
use forge_core::generation::{AspectRatio, OutputFormat, Provider, Resolution, TaskState};
use forge_core::types::DbId;
use forge_db::models::generation::SessionListQuery;
use forge_pipeline::fanout::SubmitRequest;
use forge_pipeline::poller::ProgressFn;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::provider_key::ProviderKey;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum number of task ids accepted by one status check.
pub const MAX_STATUS_BATCH: usize = 100;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

fn default_count() -> u32 {
    1
}

/// Body of `POST /generations`.
///
/// Enumerated fields arrive as strings so that unknown values are reported
/// as validation errors rather than body rejections.
#[derive(Debug, Deserialize)]
pub struct CreateGenerationRequest {
    pub prompt: String,
    pub providers: Vec<String>,
    #[serde(default = "default_count")]
    pub count_per_provider: u32,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
    pub output_format: Option<String>,
}

impl CreateGenerationRequest {
    fn into_submit(self, user_id: DbId) -> Result<SubmitRequest, CoreError> {
        let providers = self
            .providers
            .iter()
            .map(|p| Provider::from_name(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SubmitRequest {
            user_id,
            prompt: self.prompt,
            providers,
            count_per_provider: self.count_per_provider,
            aspect_ratio: self
                .aspect_ratio
                .as_deref()
                .map(AspectRatio::from_name)
                .transpose()?
                .unwrap_or_default(),
            resolution: self
                .resolution
                .as_deref()
                .map(Resolution::from_name)
                .transpose()?
                .unwrap_or_default(),
            output_format: self
                .output_format
                .as_deref()
                .map(OutputFormat::from_name)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Body of `POST /generations/status`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub task_ids: Vec<String>,
    /// Narrows the lookup; required for ids this service never persisted.
    pub provider: Option<String>,
}

/// Body of `POST /generations/{external_task_id}/wait`.
#[derive(Debug, Deserialize)]
pub struct WaitRequest {
    pub provider: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_provider_hint(name: Option<&str>) -> AppResult<Option<Provider>> {
    Ok(name.map(Provider::from_name).transpose()?)
}

fn validate_task_ids(ids: &[String]) -> AppResult<()> {
    if ids.is_empty() {
        return Err(AppError::BadRequest("task_ids must not be empty".into()));
    }
    if ids.len() > MAX_STATUS_BATCH {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_STATUS_BATCH} task ids may be checked at once"
        )));
    }
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(AppError::BadRequest("task ids must not be blank".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// POST /generations
// ---------------------------------------------------------------------------

/// Fan a prompt out to the requested providers.
///
/// Responds 201 even when some submissions failed; `failed_count` carries
/// the shortfall.
pub async fn submit(
    State(state): State<AppState>,
    auth: AuthUser,
    key: ProviderKey,
    Json(body): Json<CreateGenerationRequest>,
) -> AppResult<impl IntoResponse> {
    let request = body.into_submit(auth.user_id)?;
    let result = state.orchestrator.submit(&request, key.as_deref()).await?;

    tracing::info!(
        user_id = auth.user_id,
        role = %auth.role,
        sessions = result.sessions.len(),
        tasks = result.tasks.len(),
        failed = result.failed_count,
        "Generation submitted"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: result })))
}

// ---------------------------------------------------------------------------
// POST /generations/status
// ---------------------------------------------------------------------------

/// Check a batch of the caller's tasks. Per-task problems are reported
/// inline; other users' tasks are reported as unknown.
pub async fn check_status(
    State(state): State<AppState>,
    auth: AuthUser,
    key: ProviderKey,
    Json(body): Json<StatusRequest>,
) -> AppResult<impl IntoResponse> {
    validate_task_ids(&body.task_ids)?;
    let hint = parse_provider_hint(body.provider.as_deref())?;

    let reports = state
        .orchestrator
        .check_status(auth.user_id, &body.task_ids, hint, key.as_deref())
        .await;

    tracing::debug!(
        user_id = auth.user_id,
        count = reports.len(),
        "Checked generation status"
    );

    Ok(Json(DataResponse { data: reports }))
}

// ---------------------------------------------------------------------------
// POST /generations/{external_task_id}/wait
// ---------------------------------------------------------------------------

/// Block until the task settles or the poll budget is spent.
pub async fn wait_for_task(
    State(state): State<AppState>,
    auth: AuthUser,
    key: ProviderKey,
    Path(external_task_id): Path<String>,
    Json(body): Json<WaitRequest>,
) -> AppResult<impl IntoResponse> {
    let provider = Provider::from_name(&body.provider)?;

    let progress: ProgressFn<'_> = &|task_state: TaskState, attempt: u32| {
        tracing::debug!(
            external_task_id = %external_task_id,
            state = ?task_state,
            attempt,
            "Poll progress"
        );
    };

    let outcome = state
        .orchestrator
        .poll_until_complete(
            auth.user_id,
            &external_task_id,
            provider,
            key.as_deref(),
            Some(progress),
        )
        .await;

    tracing::info!(
        user_id = auth.user_id,
        external_task_id = %external_task_id,
        success = outcome.success,
        attempts = outcome.attempts,
        timed_out = outcome.timed_out,
        "Wait finished"
    );

    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// GET /generations/sessions
// ---------------------------------------------------------------------------

/// List the caller's sessions, newest first.
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SessionListQuery>,
) -> AppResult<impl IntoResponse> {
    let sessions = state
        .orchestrator
        .list_sessions(auth.user_id, &params)
        .await?;
    Ok(Json(DataResponse { data: sessions }))
}

// ---------------------------------------------------------------------------
// GET /generations/sessions/{id}
// ---------------------------------------------------------------------------

/// One of the caller's sessions with its tasks.
pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = state.orchestrator.session_detail(auth.user_id, id).await?;
    Ok(Json(DataResponse { data: detail }))
}
