//! Clients for the third-party image-generation providers.
//!
//! Provides the per-provider adapter table, the HTTP client that speaks
//! their REST APIs, status normalization, result-URL extraction, and the
//! [`gateway::ProviderGateway`] seam the orchestrator depends on.

pub mod adapters;
pub mod api;
pub mod extract;
pub mod gateway;
pub mod status;
