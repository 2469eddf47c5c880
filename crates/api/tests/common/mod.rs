//! Shared helpers for API integration tests.
//!
//! The app is wired exactly as in production except for the task store,
//! which is in-memory, and the provider API, which is a wiremock server.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forge_api::auth::jwt::{generate_access_token, JwtConfig};
use forge_api::config::{ProviderSettings, ServerConfig, StorageConfig};
use forge_api::router::build_app_router;
use forge_api::state::AppState;
use forge_pipeline::memory::MemoryTaskStore;
use forge_pipeline::GenerationOrchestrator;
use forge_providers::api::ProviderClient;
use forge_storage::LocalBlobStore;

pub const PUBLIC_BASE: &str = "http://localhost:3000/blobs";
pub const DEFAULT_PROVIDER_KEY: &str = "server-key";

/// Build a test `ServerConfig` pointing at `provider_url` and storing
/// results under `blob_root`.
pub fn test_config(provider_url: &str, blob_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-jwt-secret".to_string(),
            access_token_expiry_mins: 15,
        },
        provider: ProviderSettings {
            base_url: provider_url.to_string(),
            api_key: Some(DEFAULT_PROVIDER_KEY.to_string()),
            timeout_secs: 5,
        },
        storage: StorageConfig::Local {
            root: blob_root.to_path_buf(),
            public_base_url: PUBLIC_BASE.to_string(),
        },
        poll_max_attempts: 3,
        materialize_lease_secs: 120,
    }
}

/// A running test application with handles on its collaborators.
pub struct TestApp {
    pub app: Router,
    pub config: ServerConfig,
    pub store: Arc<MemoryTaskStore>,
    pub server: MockServer,
    pub blob_dir: tempfile::TempDir,
}

impl TestApp {
    /// Bearer token for `user_id`.
    pub fn token(&self, user_id: i64) -> String {
        generate_access_token(user_id, "user", &self.config.jwt).unwrap()
    }

    pub async fn get(&self, uri: &str, user_id: Option<i64>) -> Response<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(user) = user_id {
            builder = builder.header("authorization", format!("Bearer {}", self.token(user)));
        }
        self.app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_json(
        &self,
        uri: &str,
        user_id: Option<i64>,
        body: serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user_id {
            builder = builder.header("authorization", format!("Bearer {}", self.token(user)));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.app
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }
}

/// Build the full application router with all middleware layers.
pub async fn build_test_app() -> TestApp {
    let server = MockServer::start().await;
    let blob_dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), blob_dir.path());

    let store = Arc::new(MemoryTaskStore::new());
    let orchestrator = GenerationOrchestrator::new(
        Arc::new(ProviderClient::new(config.provider_client_config()).unwrap()),
        store.clone(),
        Arc::new(LocalBlobStore::new(blob_dir.path(), PUBLIC_BASE)),
        config.orchestrator_config(),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    TestApp {
        app,
        config,
        store,
        server,
        blob_dir,
    }
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body into raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

// ---------------------------------------------------------------------------
// Provider mocks
// ---------------------------------------------------------------------------

/// Accept jobs-API submissions, answering with `task_id`.
pub async fn mock_jobs_submit(server: &MockServer, task_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/createTask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "success",
            "data": { "taskId": task_id },
        })))
        .mount(server)
        .await;
}

/// Answer jobs-API status lookups for `task_id` with `data`.
pub async fn mock_jobs_record(server: &MockServer, task_id: &str, data: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/recordInfo"))
        .and(query_param("taskId", task_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "success",
            "data": data,
        })))
        .mount(server)
        .await;
}

/// Serve `bytes` as a PNG at `file_path` and return its absolute URL.
pub async fn mock_image(server: &MockServer, file_path: &str, bytes: &[u8]) -> String {
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(bytes.to_vec()),
        )
        .mount(server)
        .await;
    format!("{}{file_path}", server.uri())
}
