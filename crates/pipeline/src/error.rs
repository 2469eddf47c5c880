use forge_core::error::CoreError;

use crate::store::StoreError;

/// Errors surfaced by orchestrator operations.
///
/// Per-task provider and storage failures are not errors at this level:
/// they are counted (submission) or reported per task (status checks).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
