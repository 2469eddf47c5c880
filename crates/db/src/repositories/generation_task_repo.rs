//! Repository for the `generation_tasks` table.
//!
//! Every state change is a single conditional `UPDATE` so that concurrent
//! status checks cannot move a task backwards or write its result twice.
//! A `None` return from a transition means another caller got there first
//! (or the transition was not legal from the current state).

use forge_core::types::DbId;
use sqlx::PgPool;

use crate::models::generation::{CreateGenerationTask, GenerationTask, MaterializedResult};
use crate::models::status::{StatusId, TaskStatus};

/// Column list for `generation_tasks` queries.
const COLUMNS: &str = "\
    id, session_id, user_id, provider, external_task_id, prompt, \
    aspect_ratio, resolution, output_format, status_id, \
    result_url, storage_key, ephemeral_url, error_message, \
    materialize_claimed_at, created_at, updated_at, completed_at";

/// Non-terminal statuses: queued, processing.
const OPEN_STATUSES: [StatusId; 2] = [
    TaskStatus::Queued as StatusId,
    TaskStatus::Processing as StatusId,
];

/// Provides CRUD and state-transition operations for generation tasks.
pub struct GenerationTaskRepo;

impl GenerationTaskRepo {
    /// Insert a freshly submitted task in the `Queued` state.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGenerationTask,
    ) -> Result<GenerationTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_tasks \
                (session_id, user_id, provider, external_task_id, prompt, \
                 aspect_ratio, resolution, output_format, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(input.session_id)
            .bind(input.user_id)
            .bind(input.provider.name())
            .bind(&input.external_task_id)
            .bind(&input.prompt)
            .bind(input.aspect_ratio.as_str())
            .bind(input.resolution.as_str())
            .bind(input.output_format.as_str())
            .bind(TaskStatus::Queued.id())
            .fetch_one(pool)
            .await
    }

    /// Find a task by the provider's external id.
    ///
    /// External ids are only unique per provider; without a provider the
    /// most recently created match wins.
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_task_id: &str,
        provider: Option<&str>,
    ) -> Result<Option<GenerationTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_tasks \
             WHERE external_task_id = $1 AND ($2::TEXT IS NULL OR provider = $2) \
             ORDER BY id DESC LIMIT 1"
        );
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(external_task_id)
            .bind(provider)
            .fetch_optional(pool)
            .await
    }

    /// List all tasks of a session in creation order.
    pub async fn list_for_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<GenerationTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_tasks WHERE session_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    // ── State transitions ────────────────────────────────────────────

    /// Move a queued task to `Processing`. No-op from any other state.
    pub async fn mark_processing(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GenerationTask>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_tasks \
             SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(id)
            .bind(TaskStatus::Processing.id())
            .bind(TaskStatus::Queued.id())
            .fetch_optional(pool)
            .await
    }

    /// Take the exclusive right to materialize a task's output.
    ///
    /// Succeeds for exactly one caller while the task is open, has no
    /// durable URL, and holds no claim younger than `lease_secs`. Returns
    /// `true` if the claim was taken.
    pub async fn claim_materialization(
        pool: &PgPool,
        id: DbId,
        lease_secs: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_tasks \
             SET materialize_claimed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND result_url IS NULL AND status_id IN ($2, $3) \
               AND (materialize_claimed_at IS NULL \
                    OR materialize_claimed_at < NOW() - make_interval(secs => $4))",
        )
        .bind(id)
        .bind(OPEN_STATUSES[0])
        .bind(OPEN_STATUSES[1])
        .bind(lease_secs as f64)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Give up a claim after a failed download or storage write so the next
    /// status check can retry immediately.
    pub async fn release_materialization(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_tasks \
             SET materialize_claimed_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND result_url IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record the durable result and move the task to `Succeeded`.
    ///
    /// Only applies while the task is open and has no durable URL.
    pub async fn mark_succeeded(
        pool: &PgPool,
        id: DbId,
        result: &MaterializedResult,
    ) -> Result<Option<GenerationTask>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_tasks \
             SET status_id = $2, result_url = $3, storage_key = $4, ephemeral_url = $5, \
                 materialize_claimed_at = NULL, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND result_url IS NULL AND status_id IN ($6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(id)
            .bind(TaskStatus::Succeeded.id())
            .bind(&result.result_url)
            .bind(&result.storage_key)
            .bind(&result.ephemeral_url)
            .bind(OPEN_STATUSES[0])
            .bind(OPEN_STATUSES[1])
            .fetch_optional(pool)
            .await
    }

    /// Record a provider-reported failure and move the task to `Failed`.
    ///
    /// Only applies while the task is open, so the first recorded reason is
    /// the one that sticks.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        reason: &str,
    ) -> Result<Option<GenerationTask>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_tasks \
             SET status_id = $2, error_message = $3, materialize_claimed_at = NULL, \
                 completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(id)
            .bind(TaskStatus::Failed.id())
            .bind(reason)
            .bind(OPEN_STATUSES[0])
            .bind(OPEN_STATUSES[1])
            .fetch_optional(pool)
            .await
    }
}
