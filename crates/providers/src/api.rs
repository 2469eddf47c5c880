//! REST client for the provider HTTP endpoints.
//!
//! Wraps submission, status lookup, and result download using [`reqwest`].
//! Every provider response is an envelope `{code, msg, data}`; a `code`
//! other than 200 is a rejection even when the HTTP status is 2xx.

use std::time::Duration;

use forge_core::generation::{GenerationParams, Provider};
use serde::Deserialize;
use serde_json::Value;

use crate::adapters::spec_for;

/// Default public endpoint for all four providers.
pub const DEFAULT_BASE_URL: &str = "https://api.kie.ai";

/// Default timeout for a single outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Envelope `code` meaning success.
const ENVELOPE_OK: i64 = 200;

/// Connection settings for [`ProviderClient`].
#[derive(Debug, Clone)]
pub struct ProviderClientConfig {
    /// Base HTTP URL, e.g. `https://api.kie.ai`.
    pub base_url: String,
    /// Credential used when a call does not supply its own.
    pub default_api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ProviderClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP client shared by every provider.
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    default_api_key: Option<String>,
}

/// Errors from the provider REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider answered 2xx but the envelope `code` was not 200.
    #[error("Provider rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// A submission was accepted but the response carried no task id.
    #[error("{provider} response did not include a task id")]
    MissingTaskId { provider: Provider },

    /// Neither the call nor the configuration supplied a credential.
    #[error("No provider credential configured")]
    MissingCredential,

    /// The response body could not be interpreted.
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
}

impl ProviderClient {
    /// Build a client with its own connection pool.
    pub fn new(config: ProviderClientConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config.base_url, config.default_api_key))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        default_api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_api_key: default_api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Submit one generation. Returns the provider's external task id.
    pub async fn submit(
        &self,
        params: &GenerationParams,
        api_key: Option<&str>,
    ) -> Result<String, ProviderError> {
        let spec = spec_for(params.provider);
        let token = self.credential(api_key)?;

        let response = self
            .client
            .post(format!("{}{}", self.base_url, spec.submit_path))
            .bearer_auth(token)
            .json(&spec.body(params))
            .send()
            .await?;

        let body = Self::parse_envelope(response).await?;
        body.pointer(spec.task_id_pointer)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or(ProviderError::MissingTaskId {
                provider: params.provider,
            })
    }

    /// Fetch the raw status record for a task. Returns the envelope's `data`.
    pub async fn fetch_record(
        &self,
        provider: Provider,
        external_task_id: &str,
        api_key: Option<&str>,
    ) -> Result<Value, ProviderError> {
        let spec = spec_for(provider);
        let token = self.credential(api_key)?;

        let response = self
            .client
            .get(format!("{}{}", self.base_url, spec.status_path))
            .query(&[("taskId", external_task_id)])
            .bearer_auth(token)
            .send()
            .await?;

        let mut body = Self::parse_envelope(response).await?;
        match body.get_mut("data").map(Value::take) {
            Some(data @ Value::Object(_)) => Ok(data),
            _ => Err(ProviderError::Malformed(
                "status response has no data object".to_string(),
            )),
        }
    }

    /// Download a result file. Returns its bytes and `Content-Type`, if sent.
    ///
    /// Result URLs are pre-signed, so no credential is attached.
    pub async fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>), ProviderError> {
        let response = Self::ensure_success(self.client.get(url).send().await?).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }

    // ---- private helpers ----

    /// A non-blank per-call key wins over the configured default.
    fn credential<'a>(&'a self, api_key: Option<&'a str>) -> Result<&'a str, ProviderError> {
        api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or(self.default_api_key.as_deref())
            .ok_or(ProviderError::MissingCredential)
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Check HTTP status and envelope code, returning the full JSON body.
    async fn parse_envelope(response: reqwest::Response) -> Result<Value, ProviderError> {
        let response = Self::ensure_success(response).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let envelope = Envelope::deserialize(&body)
            .map_err(|e| ProviderError::Malformed(format!("missing envelope: {e}")))?;
        if envelope.code != ENVELOPE_OK {
            return Err(ProviderError::Rejected {
                code: envelope.code,
                message: envelope.msg.unwrap_or_default(),
            });
        }
        Ok(body)
    }
}
