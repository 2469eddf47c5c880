//! Materialization into a real filesystem blob store.

mod common;

use std::sync::Arc;

use common::{success, FakeGateway, EPHEMERAL_URL};
use forge_core::generation::{AspectRatio, OutputFormat, Provider, Resolution, TaskState};
use forge_pipeline::fanout::SubmitRequest;
use forge_pipeline::memory::MemoryTaskStore;
use forge_pipeline::{GenerationOrchestrator, OrchestratorConfig};
use forge_storage::LocalBlobStore;

#[tokio::test]
async fn result_is_written_under_user_and_session() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Arc::new(FakeGateway::new());
    let store = Arc::new(MemoryTaskStore::new());
    let orchestrator = GenerationOrchestrator::new(
        gateway.clone(),
        store.clone(),
        Arc::new(LocalBlobStore::new(dir.path(), "http://localhost:3000/blobs")),
        OrchestratorConfig::default(),
    );

    let result = orchestrator
        .submit(
            &SubmitRequest {
                user_id: 42,
                prompt: "dragon".to_string(),
                providers: vec![Provider::Imagen],
                count_per_provider: 1,
                aspect_ratio: AspectRatio::Landscape16x9,
                resolution: Resolution::TwoK,
                output_format: OutputFormat::Jpeg,
            },
            None,
        )
        .await
        .unwrap();
    let ext = result.tasks[0].external_task_id.clone();
    gateway.script(&ext, vec![success(&[EPHEMERAL_URL])]);

    let reports = orchestrator.check_status(42, &[ext], None, None).await;
    assert_eq!(reports[0].state, TaskState::Succeeded);
    assert_eq!(
        reports[0].result_url.as_deref(),
        Some("http://localhost:3000/blobs/generations/42/1/1.jpg")
    );

    let on_disk = std::fs::read(dir.path().join("generations/42/1/1.jpg")).unwrap();
    assert_eq!(on_disk, b"\x89PNG fake image");
}
