//! Repository for the `generation_sessions` table.

use forge_core::types::DbId;
use sqlx::PgPool;

use crate::models::generation::{CreateGenerationSession, GenerationSession, SessionListQuery};
use crate::models::status::SessionStatus;

/// Column list for `generation_sessions` queries.
const COLUMNS: &str = "\
    id, user_id, provider, prompt, requested_count, created_count, \
    failed_count, completed_count, status_id, created_at, updated_at";

/// Maximum page size for session listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for session listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD operations for generation sessions.
pub struct GenerationSessionRepo;

impl GenerationSessionRepo {
    /// Insert a new active session, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGenerationSession,
    ) -> Result<GenerationSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_sessions (user_id, provider, prompt, requested_count, status_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationSession>(&query)
            .bind(input.user_id)
            .bind(input.provider.name())
            .bind(&input.prompt)
            .bind(input.requested_count)
            .bind(SessionStatus::Active.id())
            .fetch_one(pool)
            .await
    }

    /// Find a session by its primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GenerationSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_sessions WHERE id = $1");
        sqlx::query_as::<_, GenerationSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's sessions, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        params: &SessionListQuery,
    ) -> Result<Vec<GenerationSession>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM generation_sessions \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, GenerationSession>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Record the outcome of a session's submissions.
    ///
    /// A session that created no task at all moves straight to `Failed`; one
    /// whose tasks all finished before this call moves to `Completed`.
    pub async fn record_submissions(
        pool: &PgPool,
        id: DbId,
        created_count: i32,
        failed_count: i32,
    ) -> Result<Option<GenerationSession>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_sessions \
             SET created_count = $2, failed_count = $3, updated_at = NOW(), \
                 status_id = CASE \
                     WHEN $2 = 0 THEN $4 \
                     WHEN completed_count >= $2 THEN $5 \
                     ELSE status_id END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationSession>(&query)
            .bind(id)
            .bind(created_count)
            .bind(failed_count)
            .bind(SessionStatus::Failed.id())
            .bind(SessionStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }

    /// Count one more task of the session as terminal.
    ///
    /// The session becomes `Completed` once every created task is terminal.
    /// Callers must only invoke this after winning the task's own terminal
    /// transition so each task is counted once.
    pub async fn increment_completed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_sessions \
             SET completed_count = completed_count + 1, updated_at = NOW(), \
                 status_id = CASE \
                     WHEN created_count > 0 AND completed_count + 1 >= created_count THEN $2 \
                     ELSE status_id END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(SessionStatus::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }
}
