//! Fan-out submission: one session per provider, N tasks per session.
//!
//! Providers are submitted to concurrently; the tasks of one provider go out
//! one after another. A failed submission is counted against its session
//! and never stops any other submission.

use forge_core::generation::{
    decorate_prompt, validate_fan_out, validate_prompt, AspectRatio, GenerationParams,
    OutputFormat, Provider, Resolution,
};
use forge_core::types::DbId;
use forge_db::models::generation::{
    CreateGenerationSession, CreateGenerationTask, GenerationSession,
};
use futures::future::join_all;
use serde::Serialize;

use crate::error::PipelineError;
use crate::orchestrator::GenerationOrchestrator;

/// Input to [`GenerationOrchestrator::submit`].
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub user_id: DbId,
    pub prompt: String,
    pub providers: Vec<Provider>,
    pub count_per_provider: u32,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub output_format: OutputFormat,
}

/// One successfully created task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedTask {
    pub task_id: DbId,
    pub external_task_id: String,
    pub provider: Provider,
    pub session_id: DbId,
}

/// Aggregate outcome of a fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct FanOutResult {
    pub sessions: Vec<GenerationSession>,
    /// Created tasks grouped by provider in request order.
    pub tasks: Vec<CreatedTask>,
    /// Submissions that did not produce a task, across all providers.
    pub failed_count: u32,
}

/// What one provider's unit of work produced.
struct ProviderOutcome {
    session: Option<GenerationSession>,
    tasks: Vec<CreatedTask>,
    failed: u32,
}

impl GenerationOrchestrator {
    /// Submit `request.count_per_provider` generations to each provider.
    ///
    /// Only invalid input is an error; every provider or persistence failure
    /// after validation is absorbed into `failed_count`.
    pub async fn submit(
        &self,
        request: &SubmitRequest,
        api_key: Option<&str>,
    ) -> Result<FanOutResult, PipelineError> {
        validate_prompt(&request.prompt)?;
        validate_fan_out(&request.providers, request.count_per_provider)?;

        let outcomes = join_all(
            request
                .providers
                .iter()
                .map(|&provider| self.submit_for_provider(request, provider, api_key)),
        )
        .await;

        let mut result = FanOutResult {
            sessions: Vec::with_capacity(outcomes.len()),
            tasks: Vec::new(),
            failed_count: 0,
        };
        for outcome in outcomes {
            result.sessions.extend(outcome.session);
            result.tasks.extend(outcome.tasks);
            result.failed_count += outcome.failed;
        }

        tracing::info!(
            user_id = request.user_id,
            providers = request.providers.len(),
            created = result.tasks.len(),
            failed = result.failed_count,
            "Fan-out submission finished",
        );
        Ok(result)
    }

    async fn submit_for_provider(
        &self,
        request: &SubmitRequest,
        provider: Provider,
        api_key: Option<&str>,
    ) -> ProviderOutcome {
        let count = request.count_per_provider;
        let session = match self
            .store
            .create_session(&CreateGenerationSession {
                user_id: request.user_id,
                provider,
                prompt: request.prompt.clone(),
                requested_count: count as i32,
            })
            .await
        {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(provider = %provider, error = %e, "Failed to create generation session");
                return ProviderOutcome {
                    session: None,
                    tasks: Vec::new(),
                    failed: count,
                };
            }
        };

        let mut tasks = Vec::with_capacity(count as usize);
        let mut failed = 0u32;
        for index in 0..count {
            let params = GenerationParams {
                prompt: decorate_prompt(&request.prompt, index, count),
                provider,
                aspect_ratio: request.aspect_ratio,
                resolution: request.resolution,
                output_format: request.output_format,
            };
            match self.submit_one(&session, &params, api_key).await {
                Some(task) => tasks.push(task),
                None => failed += 1,
            }
        }

        let session = match self
            .store
            .record_submissions(session.id, tasks.len() as i32, failed as i32)
            .await
        {
            Ok(Some(updated)) => updated,
            Ok(None) => session,
            Err(e) => {
                tracing::error!(session_id = session.id, error = %e, "Failed to record submission counts");
                session
            }
        };

        ProviderOutcome {
            session: Some(session),
            tasks,
            failed,
        }
    }

    /// Submit one task and persist it. `None` means the unit was dropped.
    async fn submit_one(
        &self,
        session: &GenerationSession,
        params: &GenerationParams,
        api_key: Option<&str>,
    ) -> Option<CreatedTask> {
        let external_task_id = match self.gateway.submit(params, api_key).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    session_id = session.id,
                    provider = %params.provider,
                    error = %e,
                    "Provider submission failed",
                );
                return None;
            }
        };

        let input = CreateGenerationTask {
            session_id: session.id,
            user_id: session.user_id,
            provider: params.provider,
            external_task_id,
            prompt: params.prompt.clone(),
            aspect_ratio: params.aspect_ratio,
            resolution: params.resolution,
            output_format: params.output_format,
        };
        match self.store.create_task(&input).await {
            Ok(task) => Some(CreatedTask {
                task_id: task.id,
                external_task_id: task.external_task_id,
                provider: params.provider,
                session_id: session.id,
            }),
            Err(e) => {
                // The provider task exists but is untracked; it will never be
                // materialized.
                tracing::error!(
                    session_id = session.id,
                    provider = %params.provider,
                    external_task_id = %input.external_task_id,
                    error = %e,
                    "Failed to persist submitted task",
                );
                None
            }
        }
    }
}
