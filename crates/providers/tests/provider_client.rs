//! HTTP-level tests for the provider client against a mock server.
//!
//! Uses wiremock to stand in for the provider API, so every request shape,
//! credential header, and envelope variation is exercised without network.

use assert_matches::assert_matches;
use forge_core::generation::{
    AspectRatio, GenerationParams, OutputFormat, Provider, Resolution, TaskState,
};
use forge_providers::api::{ProviderClient, ProviderError};
use forge_providers::gateway::ProviderGateway;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, default_key: Option<&str>) -> ProviderClient {
    ProviderClient::with_client(
        reqwest::Client::new(),
        server.uri(),
        default_key.map(str::to_string),
    )
}

fn params(provider: Provider, prompt: &str) -> GenerationParams {
    GenerationParams {
        prompt: prompt.to_string(),
        provider,
        aspect_ratio: AspectRatio::Square,
        resolution: Resolution::OneK,
        output_format: OutputFormat::Png,
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn jobs_submission_returns_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/createTask"))
        .and(header("authorization", "Bearer default-key"))
        .and(body_partial_json(json!({
            "model": "google/nano-banana",
            "input": { "prompt": "dragon", "image_size": "1:1" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "msg": "success",
            "data": { "taskId": "task-nb-1" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = ProviderGateway::submit(
        &client(&server, Some("default-key")),
        &params(Provider::NanoBanana, "dragon"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(id, "task-nb-1");
}

#[tokio::test]
async fn per_call_key_overrides_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/gpt4o-image/generate"))
        .and(header("authorization", "Bearer caller-key"))
        .and(body_partial_json(json!({ "size": "1024x1024", "nVariants": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": { "taskId": "task-gpt-1" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = ProviderGateway::submit(
        &client(&server, Some("default-key")),
        &params(Provider::GptImage, "dragon"),
        Some("caller-key"),
    )
    .await
    .unwrap();
    assert_eq!(id, "task-gpt-1");
}

#[tokio::test]
async fn envelope_code_other_than_200_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/createTask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 402,
            "msg": "insufficient credits",
            "data": null,
        })))
        .mount(&server)
        .await;

    let result = ProviderGateway::submit(
        &client(&server, Some("k")),
        &params(Provider::Imagen, "dragon"),
        None,
    )
    .await;
    assert_matches!(result, Err(ProviderError::Rejected { code: 402, .. }));
}

#[tokio::test]
async fn success_without_task_id_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/createTask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 200, "data": {} })))
        .mount(&server)
        .await;

    let result = ProviderGateway::submit(
        &client(&server, Some("k")),
        &params(Provider::Seedream, "dragon"),
        None,
    )
    .await;
    assert_matches!(
        result,
        Err(ProviderError::MissingTaskId {
            provider: Provider::Seedream
        })
    );
}

#[tokio::test]
async fn http_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/createTask"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = ProviderGateway::submit(
        &client(&server, Some("k")),
        &params(Provider::NanoBanana, "dragon"),
        None,
    )
    .await;
    assert_matches!(result, Err(ProviderError::Api { status: 503, .. }));
}

#[tokio::test]
async fn missing_credential_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = ProviderGateway::submit(
        &client(&server, None),
        &params(Provider::NanoBanana, "dragon"),
        Some(""),
    )
    .await;
    assert_matches!(result, Err(ProviderError::MissingCredential));
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn jobs_status_success_is_normalized_with_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/recordInfo"))
        .and(query_param("taskId", "task-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": {
                "taskId": "task-1",
                "state": "success",
                "resultJson": "{\"resultUrls\":[\"https://ephemeral.example/x.png\"]}",
            },
        })))
        .mount(&server)
        .await;

    let status = client(&server, Some("k"))
        .fetch_status(Provider::NanoBanana, "task-1", None)
        .await
        .unwrap();
    assert_eq!(status.state, TaskState::Succeeded);
    assert_eq!(status.raw_status, "success");
    assert_eq!(status.result_urls, vec!["https://ephemeral.example/x.png"]);
}

#[tokio::test]
async fn record_status_failure_carries_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/gpt4o-image/record-info"))
        .and(query_param("taskId", "gpt-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "data": { "status": "FAILED", "errorMessage": "blocked by safety filter" },
        })))
        .mount(&server)
        .await;

    let status = client(&server, Some("k"))
        .fetch_status(Provider::GptImage, "gpt-9", None)
        .await
        .unwrap();
    assert_eq!(status.state, TaskState::Failed);
    assert_eq!(
        status.failure_reason.as_deref(),
        Some("blocked by safety filter")
    );
}

#[tokio::test]
async fn status_response_without_data_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/recordInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 200 })))
        .mount(&server)
        .await;

    let result = client(&server, Some("k"))
        .fetch_status(Provider::Imagen, "task-2", None)
        .await;
    assert_matches!(result, Err(ProviderError::Malformed(_)));
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_returns_bytes_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/x.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
        )
        .mount(&server)
        .await;

    let download = ProviderGateway::download(
        &client(&server, None),
        &format!("{}/files/x.png", server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(download.bytes, vec![0x89, b'P', b'N', b'G']);
    assert_eq!(download.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn expired_download_url_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = ProviderGateway::download(
        &client(&server, None),
        &format!("{}/files/gone.png", server.uri()),
    )
    .await;
    assert_matches!(result, Err(ProviderError::Api { status: 404, .. }));
}
