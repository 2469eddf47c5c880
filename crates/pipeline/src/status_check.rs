//! Request/response status checks.
//!
//! A check never moves persisted state backwards and never re-evaluates a
//! terminal task: succeeded and failed records are answered from the store
//! without any provider call.

use forge_core::generation::{Provider, TaskState, FAILURE_PLACEHOLDER};
use forge_core::types::DbId;
use forge_db::models::generation::GenerationTask;
use forge_providers::gateway::ProviderStatus;
use futures::future::join_all;
use serde::Serialize;

use crate::orchestrator::GenerationOrchestrator;

/// Note attached when a provider reports success without any result URL.
pub const NO_OUTPUT_NOTE: &str = "Provider reported success without a result URL";

/// Reported for a task id that is not one of the caller's tasks.
pub const UNKNOWN_TASK_NOTE: &str = "Unknown task";

/// Reported for an unpersisted task id checked without a provider.
pub const PROVIDER_REQUIRED_NOTE: &str = "Unknown task; a provider is required";

/// Reported for an unpersisted task id checked without the caller's own
/// provider key.
pub const CALLER_KEY_REQUIRED_NOTE: &str =
    "Unknown task; checking it requires your own provider key";

/// Outcome of checking one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStatusReport {
    pub external_task_id: String,
    pub provider: Option<Provider>,
    pub state: TaskState,
    /// Durable URL once materialized.
    pub result_url: Option<String>,
    /// Failure reason for `Failed`; an informational note otherwise.
    pub error: Option<String>,
}

impl TaskStatusReport {
    fn new(external_task_id: &str, provider: Option<Provider>, state: TaskState) -> Self {
        Self {
            external_task_id: external_task_id.to_string(),
            provider,
            state,
            result_url: None,
            error: None,
        }
    }

    /// Whether the check was refused without asking any provider.
    pub fn is_unknown_task(&self) -> bool {
        matches!(
            self.error.as_deref(),
            Some(UNKNOWN_TASK_NOTE | PROVIDER_REQUIRED_NOTE | CALLER_KEY_REQUIRED_NOTE)
        )
    }

    pub(crate) fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Report straight from a persisted record.
    pub(crate) fn from_record(task: &GenerationTask) -> Self {
        let provider = task.provider().ok();
        let state = task.state();
        Self {
            external_task_id: task.external_task_id.clone(),
            provider,
            state,
            result_url: task.result_url.clone(),
            error: match state {
                TaskState::Failed => Some(
                    task.error_message
                        .clone()
                        .unwrap_or_else(|| FAILURE_PLACEHOLDER.to_string()),
                ),
                _ => None,
            },
        }
    }
}

impl GenerationOrchestrator {
    /// Check a batch of `user_id`'s tasks concurrently. Reports come back in
    /// input order.
    ///
    /// `provider_hint` narrows the record lookup. `api_key` is the caller's
    /// own provider credential; `None` uses the server default. Ids with no
    /// persisted record are only looked up with both a hint and the
    /// caller's key.
    pub async fn check_status(
        &self,
        user_id: DbId,
        external_task_ids: &[String],
        provider_hint: Option<Provider>,
        api_key: Option<&str>,
    ) -> Vec<TaskStatusReport> {
        join_all(
            external_task_ids
                .iter()
                .map(|id| self.check_one(user_id, id, provider_hint, api_key)),
        )
        .await
    }

    /// Check a single task, materializing its result inline on success.
    ///
    /// Another user's task is reported as unknown with no provider call.
    pub async fn check_one(
        &self,
        user_id: DbId,
        external_task_id: &str,
        provider_hint: Option<Provider>,
        api_key: Option<&str>,
    ) -> TaskStatusReport {
        let record = match self
            .store
            .find_task_by_external_id(external_task_id, provider_hint)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(external_task_id, error = %e, "Task lookup failed");
                return TaskStatusReport::new(external_task_id, provider_hint, TaskState::Queued)
                    .with_error(format!("Task store unavailable: {e}"));
            }
        };

        if let Some(task) = &record {
            if task.user_id != user_id {
                tracing::warn!(
                    user_id,
                    owner_id = task.user_id,
                    external_task_id,
                    "Status check for another user's task refused",
                );
                return TaskStatusReport::new(external_task_id, None, TaskState::Queued)
                    .with_error(UNKNOWN_TASK_NOTE);
            }
            if task.state().is_terminal() {
                return TaskStatusReport::from_record(task);
            }
        }

        let provider = match record.as_ref().map(GenerationTask::provider) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return TaskStatusReport::new(external_task_id, provider_hint, TaskState::Queued)
                    .with_error(e.to_string());
            }
            None => match (provider_hint, api_key) {
                (Some(p), Some(_)) => p,
                (Some(p), None) => {
                    return TaskStatusReport::new(external_task_id, Some(p), TaskState::Queued)
                        .with_error(CALLER_KEY_REQUIRED_NOTE);
                }
                (None, _) => {
                    return TaskStatusReport::new(external_task_id, None, TaskState::Queued)
                        .with_error(PROVIDER_REQUIRED_NOTE);
                }
            },
        };
        let persisted = record
            .as_ref()
            .map_or(TaskState::Queued, GenerationTask::state);

        let status = match self
            .gateway
            .fetch_status(provider, external_task_id, api_key)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    external_task_id,
                    provider = %provider,
                    error = %e,
                    "Transient status check failure",
                );
                return TaskStatusReport::new(external_task_id, Some(provider), persisted)
                    .with_error(e.to_string());
            }
        };

        match record {
            Some(task) => self.apply_status(task, status).await,
            None => untracked_report(external_task_id, provider, status),
        }
    }

    /// Fold a provider observation into a persisted, non-terminal task.
    async fn apply_status(&self, task: GenerationTask, status: ProviderStatus) -> TaskStatusReport {
        let persisted = task.state();
        let provider = task.provider().ok();
        match status.state {
            TaskState::Queued | TaskState::Processing => {
                if status.state == TaskState::Processing && persisted == TaskState::Queued {
                    if let Err(e) = self.store.mark_processing(task.id).await {
                        tracing::warn!(task_id = task.id, error = %e, "Failed to record processing state");
                    }
                }
                let state = if persisted.can_advance_to(status.state) {
                    status.state
                } else {
                    persisted
                };
                TaskStatusReport::new(&task.external_task_id, provider, state)
            }
            TaskState::Succeeded => match status.result_urls.first() {
                Some(url) => self.materialize(&task, url).await,
                None => {
                    tracing::warn!(
                        task_id = task.id,
                        external_task_id = %task.external_task_id,
                        "Provider reported success without output",
                    );
                    TaskStatusReport::new(&task.external_task_id, provider, TaskState::Succeeded)
                        .with_error(NO_OUTPUT_NOTE)
                }
            },
            TaskState::Failed => {
                let reason = status
                    .failure_reason
                    .unwrap_or_else(|| FAILURE_PLACEHOLDER.to_string());
                self.record_failure(task, &reason).await
            }
        }
    }

    async fn record_failure(&self, task: GenerationTask, reason: &str) -> TaskStatusReport {
        match self.store.mark_failed(task.id, reason).await {
            Ok(Some(failed)) => {
                tracing::info!(
                    task_id = failed.id,
                    external_task_id = %failed.external_task_id,
                    reason,
                    "Generation task failed",
                );
                self.count_terminal(failed.session_id).await;
                TaskStatusReport::from_record(&failed)
            }
            // Someone else finished the task first; report what they wrote.
            Ok(None) => self.reload_report(&task).await,
            Err(e) => {
                tracing::error!(task_id = task.id, error = %e, "Failed to record task failure");
                TaskStatusReport::new(&task.external_task_id, task.provider().ok(), task.state())
                    .with_error(format!("Task store unavailable: {e}"))
            }
        }
    }

    /// Re-read a task after losing a conditional update.
    pub(crate) async fn reload_report(&self, task: &GenerationTask) -> TaskStatusReport {
        let provider = task.provider().ok();
        match self
            .store
            .find_task_by_external_id(&task.external_task_id, provider)
            .await
        {
            Ok(Some(current)) => TaskStatusReport::from_record(&current),
            Ok(None) => TaskStatusReport::from_record(task),
            Err(e) => TaskStatusReport::new(&task.external_task_id, provider, task.state())
                .with_error(format!("Task store unavailable: {e}")),
        }
    }

    /// Count a task's terminal transition against its session.
    pub(crate) async fn count_terminal(&self, session_id: forge_core::types::DbId) {
        if let Err(e) = self.store.increment_session_completed(session_id).await {
            tracing::error!(session_id, error = %e, "Failed to update session completion");
        }
    }
}

/// Report for a task the store does not know about.
///
/// Without a record there is no owner to scope a storage key by, so a
/// success is reported with the provider's own URL and nothing is persisted.
fn untracked_report(
    external_task_id: &str,
    provider: Provider,
    status: ProviderStatus,
) -> TaskStatusReport {
    let report = TaskStatusReport::new(external_task_id, Some(provider), status.state);
    match status.state {
        TaskState::Succeeded => match status.result_urls.into_iter().next() {
            Some(url) => TaskStatusReport {
                result_url: Some(url),
                ..report
            }
            .with_error("Untracked task; result was not persisted"),
            None => report.with_error(NO_OUTPUT_NOTE),
        },
        TaskState::Failed => report.with_error(
            status
                .failure_reason
                .unwrap_or_else(|| FAILURE_PLACEHOLDER.to_string()),
        ),
        _ => report,
    }
}
