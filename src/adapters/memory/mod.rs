//! In-memory adapters for tests, demos and the catalog-backed CLI.

pub mod config_repository;
pub mod vector_backend;

pub use config_repository::{InMemoryAgentConfigRepository, InMemoryToolRepository};
pub use vector_backend::InMemoryVectorBackend;
