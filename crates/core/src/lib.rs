//! Shared domain types and pure logic for the generation orchestrator.
//!
//! Nothing in this crate performs I/O. Provider HTTP calls live in
//! `forge-providers`, persistence in `forge-db`, and the orchestration
//! that ties them together in `forge-pipeline`.

pub mod error;
pub mod generation;
pub mod polling;
pub mod types;
