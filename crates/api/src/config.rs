use std::path::PathBuf;
use std::time::Duration;

use forge_pipeline::OrchestratorConfig;
use forge_providers::api::{ProviderClientConfig, DEFAULT_BASE_URL};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Does not apply to
    /// the blocking wait endpoint.
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub provider: ProviderSettings,
    pub storage: StorageConfig,
    /// Attempt budget of the blocking wait endpoint (default: `60`).
    pub poll_max_attempts: u32,
    /// Materialization claim lease in seconds (default: `120`).
    pub materialize_lease_secs: u64,
}

/// Outbound provider connection settings.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    /// Default credential; callers may override per request.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Where materialized results are written.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Local directory, served by this process under `/blobs`.
    Local {
        root: PathBuf,
        public_base_url: String,
    },
    S3 {
        bucket: String,
        public_base_url: String,
    },
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                       |
    /// |------------------------------|-------------------------------|
    /// | `HOST`                       | `0.0.0.0`                     |
    /// | `PORT`                       | `3000`                        |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`       |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                          |
    /// | `PROVIDER_BASE_URL`          | `https://api.kie.ai`          |
    /// | `PROVIDER_API_KEY`           | --                            |
    /// | `PROVIDER_TIMEOUT_SECS`      | `60`                          |
    /// | `POLL_MAX_ATTEMPTS`          | `60`                          |
    /// | `MATERIALIZE_LEASE_SECS`     | `120`                         |
    /// | `STORAGE_BACKEND`            | `local`                       |
    /// | `STORAGE_LOCAL_ROOT`         | `./data/blobs`                |
    /// | `STORAGE_PUBLIC_BASE_URL`    | `http://localhost:3000/blobs` |
    /// | `STORAGE_S3_BUCKET`          | required for `s3`             |
    /// | `STORAGE_S3_PUBLIC_BASE_URL` | required for `s3`             |
    ///
    /// # Panics
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let provider = ProviderSettings {
            base_url: std::env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
            api_key: std::env::var("PROVIDER_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .expect("PROVIDER_TIMEOUT_SECS must be a valid u64"),
        };

        let poll_max_attempts: u32 = std::env::var("POLL_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("POLL_MAX_ATTEMPTS must be a valid u32");

        let materialize_lease_secs: u64 = std::env::var("MATERIALIZE_LEASE_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("MATERIALIZE_LEASE_SECS must be a valid u64");

        let storage = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".into())
            .as_str()
        {
            "local" => StorageConfig::Local {
                root: std::env::var("STORAGE_LOCAL_ROOT")
                    .unwrap_or_else(|_| "./data/blobs".into())
                    .into(),
                public_base_url: std::env::var("STORAGE_PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/blobs".into()),
            },
            "s3" => StorageConfig::S3 {
                bucket: std::env::var("STORAGE_S3_BUCKET")
                    .expect("STORAGE_S3_BUCKET must be set for the s3 backend"),
                public_base_url: std::env::var("STORAGE_S3_PUBLIC_BASE_URL")
                    .expect("STORAGE_S3_PUBLIC_BASE_URL must be set for the s3 backend"),
            },
            other => panic!("STORAGE_BACKEND must be 'local' or 's3', got '{other}'"),
        };

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            provider,
            storage,
            poll_max_attempts,
            materialize_lease_secs,
        }
    }

    pub fn provider_client_config(&self) -> ProviderClientConfig {
        ProviderClientConfig {
            base_url: self.provider.base_url.clone(),
            default_api_key: self.provider.api_key.clone(),
            timeout: Duration::from_secs(self.provider.timeout_secs),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_poll_attempts: self.poll_max_attempts,
            materialize_lease: Duration::from_secs(self.materialize_lease_secs),
        }
    }
}
