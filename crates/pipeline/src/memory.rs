//! In-process [`TaskStore`] with the same conditional-update semantics as
//! the Postgres repositories.
//!
//! Used by tests and by local runs without a database. All state lives
//! behind one mutex, so each operation is atomic just as the single-statement
//! SQL updates are.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use forge_core::generation::Provider;
use forge_core::types::DbId;
use forge_db::models::generation::{
    CreateGenerationSession, CreateGenerationTask, GenerationSession, GenerationTask,
    MaterializedResult, SessionListQuery,
};
use forge_db::models::status::{SessionStatus, TaskStatus};

use crate::store::{StoreError, TaskStore};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Default)]
struct Inner {
    sessions: Vec<GenerationSession>,
    tasks: Vec<GenerationTask>,
    /// Number of applied task transitions (claims excluded).
    task_writes: usize,
}

impl Inner {
    fn task_mut(&mut self, id: DbId) -> Option<&mut GenerationTask> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn session_mut(&mut self, id: DbId) -> Option<&mut GenerationSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }
}

fn is_open(task: &GenerationTask) -> bool {
    task.status_id == TaskStatus::Queued.id() || task.status_id == TaskStatus::Processing.id()
}

/// Mutex-guarded in-memory store.
#[derive(Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every task, in creation order.
    pub fn tasks(&self) -> Vec<GenerationTask> {
        self.lock().tasks.clone()
    }

    /// Number of task state transitions that actually applied.
    pub fn task_writes(&self) -> usize {
        self.lock().task_writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a half-applied update,
        // so a poisoned lock is still consistent.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create_session(
        &self,
        input: &CreateGenerationSession,
    ) -> Result<GenerationSession, StoreError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let session = GenerationSession {
            id: inner.sessions.len() as DbId + 1,
            user_id: input.user_id,
            provider: input.provider.name().to_string(),
            prompt: input.prompt.clone(),
            requested_count: input.requested_count,
            created_count: 0,
            failed_count: 0,
            completed_count: 0,
            status_id: SessionStatus::Active.id(),
            created_at: now,
            updated_at: now,
        };
        inner.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: DbId) -> Result<Option<GenerationSession>, StoreError> {
        Ok(self.lock().sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_sessions(
        &self,
        user_id: DbId,
        params: &SessionListQuery,
    ) -> Result<Vec<GenerationSession>, StoreError> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as usize;
        let offset = params.offset.unwrap_or(0).max(0) as usize;
        Ok(self
            .lock()
            .sessions
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn record_submissions(
        &self,
        session_id: DbId,
        created_count: i32,
        failed_count: i32,
    ) -> Result<Option<GenerationSession>, StoreError> {
        let mut inner = self.lock();
        let Some(session) = inner.session_mut(session_id) else {
            return Ok(None);
        };
        session.created_count = created_count;
        session.failed_count = failed_count;
        session.updated_at = Utc::now();
        if created_count == 0 {
            session.status_id = SessionStatus::Failed.id();
        } else if session.completed_count >= created_count {
            session.status_id = SessionStatus::Completed.id();
        }
        Ok(Some(session.clone()))
    }

    async fn increment_session_completed(&self, session_id: DbId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(session) = inner.session_mut(session_id) {
            session.completed_count += 1;
            session.updated_at = Utc::now();
            if session.created_count > 0 && session.completed_count >= session.created_count {
                session.status_id = SessionStatus::Completed.id();
            }
        }
        Ok(())
    }

    async fn create_task(
        &self,
        input: &CreateGenerationTask,
    ) -> Result<GenerationTask, StoreError> {
        let mut inner = self.lock();
        let provider = input.provider.name();
        if inner
            .tasks
            .iter()
            .any(|t| t.provider == provider && t.external_task_id == input.external_task_id)
        {
            return Err(StoreError::Conflict(format!(
                "{provider} task {} already exists",
                input.external_task_id
            )));
        }
        let now = Utc::now();
        let task = GenerationTask {
            id: inner.tasks.len() as DbId + 1,
            session_id: input.session_id,
            user_id: input.user_id,
            provider: provider.to_string(),
            external_task_id: input.external_task_id.clone(),
            prompt: input.prompt.clone(),
            aspect_ratio: input.aspect_ratio.as_str().to_string(),
            resolution: input.resolution.as_str().to_string(),
            output_format: input.output_format.as_str().to_string(),
            status_id: TaskStatus::Queued.id(),
            result_url: None,
            storage_key: None,
            ephemeral_url: None,
            error_message: None,
            materialize_claimed_at: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        inner.tasks.push(task.clone());
        Ok(task)
    }

    async fn find_task_by_external_id(
        &self,
        external_task_id: &str,
        provider: Option<Provider>,
    ) -> Result<Option<GenerationTask>, StoreError> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .rev()
            .find(|t| {
                t.external_task_id == external_task_id
                    && provider.map_or(true, |p| t.provider == p.name())
            })
            .cloned())
    }

    async fn list_session_tasks(
        &self,
        session_id: DbId,
    ) -> Result<Vec<GenerationTask>, StoreError> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn mark_processing(&self, id: DbId) -> Result<Option<GenerationTask>, StoreError> {
        let mut inner = self.lock();
        let updated = match inner.task_mut(id) {
            Some(task) if task.status_id == TaskStatus::Queued.id() => {
                task.status_id = TaskStatus::Processing.id();
                task.updated_at = Utc::now();
                Some(task.clone())
            }
            _ => None,
        };
        if updated.is_some() {
            inner.task_writes += 1;
        }
        Ok(updated)
    }

    async fn claim_materialization(&self, id: DbId, lease: Duration) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let lease = chrono::Duration::from_std(lease).unwrap_or(chrono::Duration::MAX);
        match inner.task_mut(id) {
            Some(task) if is_open(task) && task.result_url.is_none() => {
                let expired = task
                    .materialize_claimed_at
                    .map_or(true, |claimed| now.signed_duration_since(claimed) > lease);
                if expired {
                    task.materialize_claimed_at = Some(now);
                    task.updated_at = now;
                }
                Ok(expired)
            }
            _ => Ok(false),
        }
    }

    async fn release_materialization(&self, id: DbId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(task) = inner.task_mut(id) {
            if task.result_url.is_none() {
                task.materialize_claimed_at = None;
                task.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn mark_succeeded(
        &self,
        id: DbId,
        result: &MaterializedResult,
    ) -> Result<Option<GenerationTask>, StoreError> {
        let mut inner = self.lock();
        let updated = match inner.task_mut(id) {
            Some(task) if is_open(task) && task.result_url.is_none() => {
                let now = Utc::now();
                task.status_id = TaskStatus::Succeeded.id();
                task.result_url = Some(result.result_url.clone());
                task.storage_key = Some(result.storage_key.clone());
                task.ephemeral_url = Some(result.ephemeral_url.clone());
                task.materialize_claimed_at = None;
                task.completed_at = Some(now);
                task.updated_at = now;
                Some(task.clone())
            }
            _ => None,
        };
        if updated.is_some() {
            inner.task_writes += 1;
        }
        Ok(updated)
    }

    async fn mark_failed(
        &self,
        id: DbId,
        reason: &str,
    ) -> Result<Option<GenerationTask>, StoreError> {
        let mut inner = self.lock();
        let updated = match inner.task_mut(id) {
            Some(task) if is_open(task) => {
                let now = Utc::now();
                task.status_id = TaskStatus::Failed.id();
                task.error_message = Some(reason.to_string());
                task.materialize_claimed_at = None;
                task.completed_at = Some(now);
                task.updated_at = now;
                Some(task.clone())
            }
            _ => None,
        };
        if updated.is_some() {
            inner.task_writes += 1;
        }
        Ok(updated)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
