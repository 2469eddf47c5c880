//! Persistence seam for the orchestrator.
//!
//! [`TaskStore`] mirrors the conditional-update repositories in `forge-db`:
//! every transition returns `None` when it did not apply, and callers treat
//! that as "someone else got there first".

use std::time::Duration;

use async_trait::async_trait;
use forge_core::generation::Provider;
use forge_core::types::DbId;
use forge_db::models::generation::{
    CreateGenerationSession, CreateGenerationTask, GenerationSession, GenerationTask,
    MaterializedResult, SessionListQuery,
};
use forge_db::repositories::{GenerationSessionRepo, GenerationTaskRepo};
use forge_db::DbPool;

/// Errors from a [`TaskStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness rule was violated (e.g. duplicate external task id).
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Create/read/conditional-update access to sessions and tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_session(
        &self,
        input: &CreateGenerationSession,
    ) -> Result<GenerationSession, StoreError>;

    async fn find_session(&self, id: DbId) -> Result<Option<GenerationSession>, StoreError>;

    async fn list_sessions(
        &self,
        user_id: DbId,
        params: &SessionListQuery,
    ) -> Result<Vec<GenerationSession>, StoreError>;

    /// Record how many submissions of a session succeeded and failed.
    async fn record_submissions(
        &self,
        session_id: DbId,
        created_count: i32,
        failed_count: i32,
    ) -> Result<Option<GenerationSession>, StoreError>;

    /// Count one task of the session as terminal.
    async fn increment_session_completed(&self, session_id: DbId) -> Result<(), StoreError>;

    async fn create_task(&self, input: &CreateGenerationTask)
        -> Result<GenerationTask, StoreError>;

    async fn find_task_by_external_id(
        &self,
        external_task_id: &str,
        provider: Option<Provider>,
    ) -> Result<Option<GenerationTask>, StoreError>;

    async fn list_session_tasks(&self, session_id: DbId)
        -> Result<Vec<GenerationTask>, StoreError>;

    async fn mark_processing(&self, id: DbId) -> Result<Option<GenerationTask>, StoreError>;

    /// Take the exclusive materialization claim. `true` if taken.
    async fn claim_materialization(&self, id: DbId, lease: Duration) -> Result<bool, StoreError>;

    async fn release_materialization(&self, id: DbId) -> Result<(), StoreError>;

    async fn mark_succeeded(
        &self,
        id: DbId,
        result: &MaterializedResult,
    ) -> Result<Option<GenerationTask>, StoreError>;

    async fn mark_failed(
        &self,
        id: DbId,
        reason: &str,
    ) -> Result<Option<GenerationTask>, StoreError>;

    /// Confirm the backend is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// [`TaskStore`] backed by the `forge-db` repositories.
#[derive(Clone)]
pub struct PgTaskStore {
    pool: DbPool,
}

impl PgTaskStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

fn map_insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Conflict(db_err.message().to_string())
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn create_session(
        &self,
        input: &CreateGenerationSession,
    ) -> Result<GenerationSession, StoreError> {
        Ok(GenerationSessionRepo::create(&self.pool, input).await?)
    }

    async fn find_session(&self, id: DbId) -> Result<Option<GenerationSession>, StoreError> {
        Ok(GenerationSessionRepo::find_by_id(&self.pool, id).await?)
    }

    async fn list_sessions(
        &self,
        user_id: DbId,
        params: &SessionListQuery,
    ) -> Result<Vec<GenerationSession>, StoreError> {
        Ok(GenerationSessionRepo::list_for_user(&self.pool, user_id, params).await?)
    }

    async fn record_submissions(
        &self,
        session_id: DbId,
        created_count: i32,
        failed_count: i32,
    ) -> Result<Option<GenerationSession>, StoreError> {
        Ok(
            GenerationSessionRepo::record_submissions(
                &self.pool,
                session_id,
                created_count,
                failed_count,
            )
            .await?,
        )
    }

    async fn increment_session_completed(&self, session_id: DbId) -> Result<(), StoreError> {
        Ok(GenerationSessionRepo::increment_completed(&self.pool, session_id).await?)
    }

    async fn create_task(
        &self,
        input: &CreateGenerationTask,
    ) -> Result<GenerationTask, StoreError> {
        GenerationTaskRepo::create(&self.pool, input)
            .await
            .map_err(map_insert_error)
    }

    async fn find_task_by_external_id(
        &self,
        external_task_id: &str,
        provider: Option<Provider>,
    ) -> Result<Option<GenerationTask>, StoreError> {
        Ok(GenerationTaskRepo::find_by_external_id(
            &self.pool,
            external_task_id,
            provider.map(Provider::name),
        )
        .await?)
    }

    async fn list_session_tasks(
        &self,
        session_id: DbId,
    ) -> Result<Vec<GenerationTask>, StoreError> {
        Ok(GenerationTaskRepo::list_for_session(&self.pool, session_id).await?)
    }

    async fn mark_processing(&self, id: DbId) -> Result<Option<GenerationTask>, StoreError> {
        Ok(GenerationTaskRepo::mark_processing(&self.pool, id).await?)
    }

    async fn claim_materialization(&self, id: DbId, lease: Duration) -> Result<bool, StoreError> {
        let lease_secs = i64::try_from(lease.as_secs()).unwrap_or(i64::MAX);
        Ok(GenerationTaskRepo::claim_materialization(&self.pool, id, lease_secs).await?)
    }

    async fn release_materialization(&self, id: DbId) -> Result<(), StoreError> {
        Ok(GenerationTaskRepo::release_materialization(&self.pool, id).await?)
    }

    async fn mark_succeeded(
        &self,
        id: DbId,
        result: &MaterializedResult,
    ) -> Result<Option<GenerationTask>, StoreError> {
        Ok(GenerationTaskRepo::mark_succeeded(&self.pool, id, result).await?)
    }

    async fn mark_failed(
        &self,
        id: DbId,
        reason: &str,
    ) -> Result<Option<GenerationTask>, StoreError> {
        Ok(GenerationTaskRepo::mark_failed(&self.pool, id, reason).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(forge_db::health_check(&self.pool).await?)
    }
}
