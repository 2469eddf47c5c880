pub mod generation;
pub mod status;
