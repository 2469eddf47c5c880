//! The provider seam used by the orchestration layer.
//!
//! [`ProviderGateway`] speaks canonical types only: raw status strings are
//! normalized and result URLs extracted before anything leaves this crate.

use async_trait::async_trait;
use forge_core::generation::{GenerationParams, Provider, TaskState};

use crate::api::{ProviderClient, ProviderError};
use crate::extract;
use crate::status::{normalize, Vocabulary};

/// One provider status observation in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub state: TaskState,
    /// The provider's own status string, kept for logging.
    pub raw_status: String,
    /// Result URLs; only populated for `Succeeded`, possibly empty.
    pub result_urls: Vec<String>,
    /// Provider failure message; only populated for `Failed`.
    pub failure_reason: Option<String>,
}

/// Bytes fetched from a result URL.
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Submission, status, and download operations against the providers.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Submit a generation and return the external task id.
    async fn submit(
        &self,
        params: &GenerationParams,
        api_key: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// Fetch and normalize the current status of a task.
    async fn fetch_status(
        &self,
        provider: Provider,
        external_task_id: &str,
        api_key: Option<&str>,
    ) -> Result<ProviderStatus, ProviderError>;

    /// Fetch the bytes behind an ephemeral result URL.
    async fn download(&self, url: &str) -> Result<Download, ProviderError>;
}

#[async_trait]
impl ProviderGateway for ProviderClient {
    async fn submit(
        &self,
        params: &GenerationParams,
        api_key: Option<&str>,
    ) -> Result<String, ProviderError> {
        let external_task_id = ProviderClient::submit(self, params, api_key).await?;
        tracing::info!(
            provider = %params.provider,
            external_task_id = %external_task_id,
            "Provider task submitted",
        );
        Ok(external_task_id)
    }

    async fn fetch_status(
        &self,
        provider: Provider,
        external_task_id: &str,
        api_key: Option<&str>,
    ) -> Result<ProviderStatus, ProviderError> {
        let data = self.fetch_record(provider, external_task_id, api_key).await?;
        let status = interpret_record(provider, &data)?;
        tracing::debug!(
            provider = %provider,
            external_task_id = %external_task_id,
            raw_status = %status.raw_status,
            state = ?status.state,
            "Provider status fetched",
        );
        Ok(status)
    }

    async fn download(&self, url: &str) -> Result<Download, ProviderError> {
        let (bytes, content_type) = ProviderClient::download(self, url).await?;
        Ok(Download {
            bytes,
            content_type,
        })
    }
}

/// Turn a status record's `data` object into a [`ProviderStatus`].
pub fn interpret_record(
    provider: Provider,
    data: &serde_json::Value,
) -> Result<ProviderStatus, ProviderError> {
    let vocabulary = Vocabulary::of(provider);
    let raw = extract::raw_status(vocabulary, data).ok_or_else(|| {
        ProviderError::Malformed(format!("{provider} status record has no status field"))
    })?;
    let state = normalize(provider, raw);

    let result_urls = match state {
        TaskState::Succeeded => extract::result_urls(vocabulary, data),
        _ => Vec::new(),
    };
    let failure_reason = match state {
        TaskState::Failed => extract::failure_reason(vocabulary, data),
        _ => None,
    };

    Ok(ProviderStatus {
        state,
        raw_status: raw.to_string(),
        result_urls,
        failure_reason,
    })
}
