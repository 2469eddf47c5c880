//! Generation session and task entity models and DTOs.
//!
//! Enum-valued columns (`provider`, `aspect_ratio`, `resolution`,
//! `output_format`) are stored as their wire names so rows stay readable in
//! `psql`; the typed accessors on each model parse them back.

use forge_core::error::CoreError;
use forge_core::generation::{AspectRatio, OutputFormat, Provider, Resolution, TaskState};
use forge_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{SessionStatus, StatusId, TaskStatus};

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// A row from the `generation_sessions` table.
///
/// One session groups the tasks a single user action created against a
/// single provider.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationSession {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub prompt: String,
    pub requested_count: i32,
    pub created_count: i32,
    pub failed_count: i32,
    pub completed_count: i32,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GenerationSession {
    pub fn status(&self) -> Option<SessionStatus> {
        SessionStatus::from_id(self.status_id)
    }
}

/// DTO for inserting a new session.
#[derive(Debug, Clone)]
pub struct CreateGenerationSession {
    pub user_id: DbId,
    pub provider: Provider,
    pub prompt: String,
    pub requested_count: i32,
}

/// Query parameters for `GET /api/v1/generations/sessions`.
#[derive(Debug, Default, Deserialize)]
pub struct SessionListQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// A row from the `generation_tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationTask {
    pub id: DbId,
    pub session_id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub external_task_id: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub resolution: String,
    pub output_format: String,
    pub status_id: StatusId,
    pub result_url: Option<String>,
    pub storage_key: Option<String>,
    pub ephemeral_url: Option<String>,
    pub error_message: Option<String>,
    #[serde(skip)]
    pub materialize_claimed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl GenerationTask {
    /// Canonical state of the persisted row.
    ///
    /// An unknown status id can only come from a bad manual edit; it is
    /// reported as `Queued` so the task is re-checked rather than dropped.
    pub fn state(&self) -> TaskState {
        TaskStatus::from_id(self.status_id)
            .map(TaskState::from)
            .unwrap_or(TaskState::Queued)
    }

    pub fn provider(&self) -> Result<Provider, CoreError> {
        Provider::from_name(&self.provider)
    }

    pub fn output_format(&self) -> Result<OutputFormat, CoreError> {
        OutputFormat::from_name(&self.output_format)
    }
}

/// DTO for inserting a new task right after a successful provider submission.
#[derive(Debug, Clone)]
pub struct CreateGenerationTask {
    pub session_id: DbId,
    pub user_id: DbId,
    pub provider: Provider,
    pub external_task_id: String,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub output_format: OutputFormat,
}

/// Fields written when a task's output has been copied to durable storage.
#[derive(Debug, Clone)]
pub struct MaterializedResult {
    pub result_url: String,
    pub storage_key: String,
    pub ephemeral_url: String,
}
