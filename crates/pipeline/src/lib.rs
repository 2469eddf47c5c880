//! Generation orchestration: fan-out submission, status checks with inline
//! result materialization, and blocking polling.
//!
//! Everything hangs off [`GenerationOrchestrator`], which depends only on the
//! [`ProviderGateway`](forge_providers::gateway::ProviderGateway),
//! [`TaskStore`](store::TaskStore) and
//! [`BlobStore`](forge_storage::BlobStore) seams.

pub mod error;
pub mod fanout;
pub mod materializer;
pub mod memory;
pub mod orchestrator;
pub mod poller;
pub mod status_check;
pub mod store;

pub use error::PipelineError;
pub use orchestrator::{GenerationOrchestrator, OrchestratorConfig};
