//! Repository structs, one per table.
//!
//! Each repository is a unit struct whose associated functions take a
//! `&PgPool` and return `sqlx::Error` on failure.

mod generation_session_repo;
mod generation_task_repo;

pub use generation_session_repo::GenerationSessionRepo;
pub use generation_task_repo::GenerationTaskRepo;
