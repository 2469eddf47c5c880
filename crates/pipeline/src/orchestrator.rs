//! The orchestrator handle and its read-side session queries.
//!
//! Submission, status checks, materialization and polling are implemented
//! as further `impl` blocks in their own modules.

use std::sync::Arc;
use std::time::Duration;

use forge_core::error::CoreError;
use forge_core::polling::DEFAULT_MAX_ATTEMPTS;
use forge_core::types::DbId;
use forge_db::models::generation::{GenerationSession, GenerationTask, SessionListQuery};
use forge_providers::gateway::ProviderGateway;
use forge_storage::BlobStore;
use serde::Serialize;

use crate::error::PipelineError;
use crate::store::TaskStore;

/// Default lifetime of a materialization claim.
pub const DEFAULT_MATERIALIZE_LEASE: Duration = Duration::from_secs(120);

/// Tunables for [`GenerationOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Attempt budget of [`GenerationOrchestrator::poll_until_complete`].
    pub max_poll_attempts: u32,
    /// How long a materialization claim blocks other callers.
    pub materialize_lease: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_poll_attempts: DEFAULT_MAX_ATTEMPTS,
            materialize_lease: DEFAULT_MATERIALIZE_LEASE,
        }
    }
}

/// Coordinates providers, persistence, and durable storage.
///
/// Cheap to share: wrap in an `Arc` and clone into request handlers.
pub struct GenerationOrchestrator {
    pub(crate) gateway: Arc<dyn ProviderGateway>,
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) config: OrchestratorConfig,
}

/// A session together with all of its tasks.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: GenerationSession,
    pub tasks: Vec<GenerationTask>,
}

impl GenerationOrchestrator {
    pub fn new(
        gateway: Arc<dyn ProviderGateway>,
        store: Arc<dyn TaskStore>,
        blobs: Arc<dyn BlobStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            blobs,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Load one of `user_id`'s sessions with its tasks.
    ///
    /// Another user's session is reported as not found.
    pub async fn session_detail(
        &self,
        user_id: DbId,
        session_id: DbId,
    ) -> Result<SessionDetail, PipelineError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or(CoreError::NotFound {
                entity: "generation_session",
                id: session_id,
            })?;
        let tasks = self.store.list_session_tasks(session.id).await?;
        Ok(SessionDetail { session, tasks })
    }

    /// List `user_id`'s sessions, newest first.
    pub async fn list_sessions(
        &self,
        user_id: DbId,
        params: &SessionListQuery,
    ) -> Result<Vec<GenerationSession>, PipelineError> {
        Ok(self.store.list_sessions(user_id, params).await?)
    }

    /// Whether the persistence backend is reachable.
    pub async fn store_healthy(&self) -> bool {
        match self.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Task store health check failed");
                false
            }
        }
    }
}
