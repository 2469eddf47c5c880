//! Shared fakes for orchestrator integration tests.
//!
//! [`FakeGateway`] plays the providers from per-task scripts and
//! [`CountingBlobStore`] records every write, so tests can assert both the
//! reported outcome and how much work was done to reach it.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use forge_core::generation::{GenerationParams, Provider, TaskState};
use forge_pipeline::memory::MemoryTaskStore;
use forge_pipeline::{GenerationOrchestrator, OrchestratorConfig};
use forge_providers::api::ProviderError;
use forge_providers::gateway::{Download, ProviderGateway, ProviderStatus};
use forge_storage::{BlobStore, StorageError};

pub const EPHEMERAL_URL: &str = "https://ephemeral.example/x.png";
pub const CDN_BASE: &str = "https://cdn.test";

// ---------------------------------------------------------------------------
// Provider statuses
// ---------------------------------------------------------------------------

/// One scripted answer to a status check.
#[derive(Debug, Clone)]
pub enum Step {
    Status(ProviderStatus),
    /// Network-level failure.
    Unreachable,
}

fn status(state: TaskState, raw: &str) -> ProviderStatus {
    ProviderStatus {
        state,
        raw_status: raw.to_string(),
        result_urls: Vec::new(),
        failure_reason: None,
    }
}

pub fn waiting() -> Step {
    Step::Status(status(TaskState::Queued, "waiting"))
}

pub fn generating() -> Step {
    Step::Status(status(TaskState::Processing, "generating"))
}

pub fn success(urls: &[&str]) -> Step {
    let mut s = status(TaskState::Succeeded, "success");
    s.result_urls = urls.iter().map(|u| u.to_string()).collect();
    Step::Status(s)
}

pub fn failed(reason: Option<&str>) -> Step {
    let mut s = status(TaskState::Failed, "fail");
    s.failure_reason = reason.map(str::to_string);
    Step::Status(s)
}

// ---------------------------------------------------------------------------
// Fake gateway
// ---------------------------------------------------------------------------

/// Scripted stand-in for the provider HTTP APIs.
///
/// Each external task id answers from its own script; the last step repeats
/// forever. Unscripted ids always answer `waiting`.
#[derive(Default)]
pub struct FakeGateway {
    failing: Mutex<HashSet<Provider>>,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    submitted: Mutex<Vec<GenerationParams>>,
    next_id: AtomicUsize,
    status_calls: AtomicUsize,
    downloads: AtomicUsize,
    fail_downloads: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every submission to `provider` fail.
    pub fn fail_provider(&self, provider: Provider) {
        self.failing.lock().unwrap().insert(provider);
    }

    pub fn script(&self, external_task_id: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(external_task_id.to_string(), steps.into());
    }

    pub fn fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<GenerationParams> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderGateway for FakeGateway {
    async fn submit(
        &self,
        params: &GenerationParams,
        _api_key: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.submitted.lock().unwrap().push(params.clone());
        if self.failing.lock().unwrap().contains(&params.provider) {
            return Err(ProviderError::Rejected {
                code: 500,
                message: "provider unavailable".to_string(),
            });
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{}-{n}", params.provider.name()))
    }

    async fn fetch_status(
        &self,
        _provider: Provider,
        external_task_id: &str,
        _api_key: Option<&str>,
    ) -> Result<ProviderStatus, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(external_task_id) {
                Some(steps) if steps.len() > 1 => steps.pop_front(),
                Some(steps) => steps.front().cloned(),
                None => None,
            }
        };
        match step.unwrap_or_else(waiting) {
            Step::Status(status) => Ok(status),
            Step::Unreachable => Err(ProviderError::Malformed("connection reset".to_string())),
        }
    }

    async fn download(&self, url: &str) -> Result<Download, ProviderError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(ProviderError::Api {
                status: 404,
                body: format!("{url} expired"),
            });
        }
        Ok(Download {
            bytes: b"\x89PNG fake image".to_vec(),
            content_type: Some("image/png".to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Blob store
// ---------------------------------------------------------------------------

/// In-memory blob store that counts writes and can be made to fail.
#[derive(Default)]
pub struct CountingBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
    failing: AtomicBool,
}

impl CountingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for CountingBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("bucket unavailable".to_string()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(format!("{CDN_BASE}/{key}"))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<MemoryTaskStore>,
    pub blobs: Arc<CountingBlobStore>,
    pub orchestrator: GenerationOrchestrator,
}

pub fn harness() -> Harness {
    harness_with(OrchestratorConfig::default())
}

pub fn harness_with(config: OrchestratorConfig) -> Harness {
    let gateway = Arc::new(FakeGateway::new());
    let store = Arc::new(MemoryTaskStore::new());
    let blobs = Arc::new(CountingBlobStore::new());
    let orchestrator =
        GenerationOrchestrator::new(gateway.clone(), store.clone(), blobs.clone(), config);
    Harness {
        gateway,
        store,
        blobs,
        orchestrator,
    }
}
