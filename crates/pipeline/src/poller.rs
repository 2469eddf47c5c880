//! Blocking poll of one task until it is terminal or the attempt budget runs
//! out.

use forge_core::generation::{Provider, TaskState};
use forge_core::polling::{poll_delay, total_wait};
use forge_core::types::DbId;
use serde::Serialize;

use crate::orchestrator::GenerationOrchestrator;

/// Observer called once per attempt with the state seen and the 1-based
/// attempt number.
pub type ProgressFn<'a> = &'a (dyn Fn(TaskState, u32) + Send + Sync);

/// Final result of [`GenerationOrchestrator::poll_until_complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOutcome {
    pub success: bool,
    /// Durable result URLs; empty unless `success`.
    pub urls: Vec<String>,
    pub error: Option<String>,
    /// Last state observed.
    pub state: TaskState,
    pub attempts: u32,
    pub timed_out: bool,
}

impl GenerationOrchestrator {
    /// Check `external_task_id` repeatedly until it succeeds, fails, or
    /// `max_poll_attempts` checks have been made.
    ///
    /// Waits [`poll_delay`] after every non-terminal attempt except the last.
    /// A transient check error counts as an attempt and polling continues.
    /// A task the caller may not check ends the poll after one attempt.
    pub async fn poll_until_complete(
        &self,
        user_id: DbId,
        external_task_id: &str,
        provider: Provider,
        api_key: Option<&str>,
        on_progress: Option<ProgressFn<'_>>,
    ) -> PollOutcome {
        let max_attempts = self.config.max_poll_attempts.max(1);
        let mut last_state = TaskState::Queued;
        tracing::debug!(
            external_task_id,
            provider = %provider,
            max_attempts,
            max_wait_secs = total_wait(max_attempts).as_secs(),
            "Polling started",
        );

        for attempt in 1..=max_attempts {
            let report = self
                .check_one(user_id, external_task_id, Some(provider), api_key)
                .await;
            last_state = report.state;
            if let Some(cb) = on_progress {
                cb(report.state, attempt);
            }
            if report.is_unknown_task() {
                return PollOutcome {
                    success: false,
                    urls: Vec::new(),
                    error: report.error,
                    state: report.state,
                    attempts: attempt,
                    timed_out: false,
                };
            }

            match report.state {
                TaskState::Succeeded => {
                    return PollOutcome {
                        success: true,
                        urls: report.result_url.into_iter().collect(),
                        error: report.error,
                        state: TaskState::Succeeded,
                        attempts: attempt,
                        timed_out: false,
                    };
                }
                TaskState::Failed => {
                    return PollOutcome {
                        success: false,
                        urls: Vec::new(),
                        error: report.error,
                        state: TaskState::Failed,
                        attempts: attempt,
                        timed_out: false,
                    };
                }
                TaskState::Queued | TaskState::Processing => {
                    if let Some(error) = &report.error {
                        tracing::debug!(external_task_id, attempt, error = %error, "Poll attempt reported an error");
                    }
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(poll_delay(attempt)).await;
            }
        }

        tracing::warn!(
            external_task_id,
            provider = %provider,
            attempts = max_attempts,
            "Polling timed out",
        );
        PollOutcome {
            success: false,
            urls: Vec::new(),
            error: Some(format!("Timed out after {max_attempts} attempts")),
            state: last_state,
            attempts: max_attempts,
            timed_out: true,
        }
    }
}
