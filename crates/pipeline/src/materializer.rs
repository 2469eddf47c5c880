//! Copy a provider's ephemeral result into durable storage.
//!
//! Guarded by a claim/finalize pair of conditional updates: only the caller
//! that wins the claim downloads and writes, and the finalize only applies
//! while the task still has no durable URL. Any failure along the way
//! releases the claim and leaves the task open for the next check.

use forge_core::generation::{OutputFormat, TaskState};
use forge_core::types::DbId;
use forge_db::models::generation::{GenerationTask, MaterializedResult};

use crate::orchestrator::GenerationOrchestrator;
use crate::status_check::TaskStatusReport;

/// Storage key for a task's result:
/// `generations/{user_id}/{session_id}/{task_id}.{ext}`.
pub fn storage_key(user_id: DbId, session_id: DbId, task_id: DbId, format: OutputFormat) -> String {
    format!(
        "generations/{user_id}/{session_id}/{task_id}.{}",
        format.extension()
    )
}

/// Pick the content type to store: the download's own if it is an image
/// type, otherwise the one implied by the requested format.
fn content_type_for(downloaded: Option<&str>, format: OutputFormat) -> String {
    downloaded
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or(format.content_type())
        .to_string()
}

impl GenerationOrchestrator {
    /// Materialize `task` from `ephemeral_url` and report the outcome.
    ///
    /// A task that already has a durable URL is answered from the record
    /// with no download and no write.
    pub(crate) async fn materialize(
        &self,
        task: &GenerationTask,
        ephemeral_url: &str,
    ) -> TaskStatusReport {
        if task.result_url.is_some() {
            return TaskStatusReport::from_record(task);
        }
        let in_progress = || {
            let mut report = TaskStatusReport::from_record(task);
            report.state = TaskState::Processing;
            report
        };

        match self
            .store
            .claim_materialization(task.id, self.config.materialize_lease)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(task_id = task.id, "Materialization claimed elsewhere");
                return in_progress();
            }
            Err(e) => {
                tracing::error!(task_id = task.id, error = %e, "Failed to claim materialization");
                return in_progress().with_error(format!("Materialization deferred: {e}"));
            }
        }

        match self.copy_to_storage(task, ephemeral_url).await {
            Ok(result) => self.finalize(task, result).await,
            Err(reason) => {
                tracing::warn!(
                    task_id = task.id,
                    external_task_id = %task.external_task_id,
                    error = %reason,
                    "Materialization failed, will retry on next check",
                );
                if let Err(e) = self.store.release_materialization(task.id).await {
                    tracing::error!(task_id = task.id, error = %e, "Failed to release materialization claim");
                }
                in_progress().with_error(format!("Materialization failed: {reason}"))
            }
        }
    }

    /// Download the ephemeral result and write it to the blob store.
    async fn copy_to_storage(
        &self,
        task: &GenerationTask,
        ephemeral_url: &str,
    ) -> Result<MaterializedResult, String> {
        let format = task.output_format().unwrap_or_default();
        let download = self
            .gateway
            .download(ephemeral_url)
            .await
            .map_err(|e| e.to_string())?;
        let content_type = content_type_for(download.content_type.as_deref(), format);
        let key = storage_key(task.user_id, task.session_id, task.id, format);

        let result_url = self
            .blobs
            .put(&key, download.bytes, &content_type)
            .await
            .map_err(|e| e.to_string())?;

        Ok(MaterializedResult {
            result_url,
            storage_key: key,
            ephemeral_url: ephemeral_url.to_string(),
        })
    }

    async fn finalize(&self, task: &GenerationTask, result: MaterializedResult) -> TaskStatusReport {
        match self.store.mark_succeeded(task.id, &result).await {
            Ok(Some(done)) => {
                tracing::info!(
                    task_id = done.id,
                    external_task_id = %done.external_task_id,
                    storage_key = %result.storage_key,
                    "Generation result materialized",
                );
                self.count_terminal(done.session_id).await;
                TaskStatusReport::from_record(&done)
            }
            Ok(None) => self.reload_report(task).await,
            Err(e) => {
                tracing::error!(task_id = task.id, error = %e, "Failed to finalize materialization");
                if let Err(e) = self.store.release_materialization(task.id).await {
                    tracing::error!(task_id = task.id, error = %e, "Failed to release materialization claim");
                }
                let mut report = TaskStatusReport::from_record(task);
                report.state = TaskState::Processing;
                report.with_error(format!("Materialization failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_scoped_by_user_and_session() {
        assert_eq!(
            storage_key(7, 3, 42, OutputFormat::Jpeg),
            "generations/7/3/42.jpg"
        );
    }

    #[test]
    fn image_content_type_from_download_wins() {
        assert_eq!(
            content_type_for(Some("image/webp; charset=binary"), OutputFormat::Png),
            "image/webp"
        );
    }

    #[test]
    fn non_image_content_type_falls_back_to_format() {
        assert_eq!(
            content_type_for(Some("application/octet-stream"), OutputFormat::Png),
            "image/png"
        );
        assert_eq!(content_type_for(None, OutputFormat::Jpeg), "image/jpeg");
    }
}
