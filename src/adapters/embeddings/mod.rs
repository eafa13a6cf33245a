//! Embedding provider adapters.

pub mod hashing;
pub mod openai;

use std::sync::Arc;

pub use hashing::HashingEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::EmbeddingProvider;

/// Build the configured embedding provider.
pub fn create_embedding_provider(
    config: &EmbeddingConfig,
    client: reqwest::Client,
) -> DomainResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.to_lowercase().as_str() {
        "hashing" | "local" => Ok(Arc::new(HashingEmbeddingProvider::new(config.dimension)?)),
        "openai" => Ok(Arc::new(OpenAiEmbeddingProvider::from_config(config, client)?)),
        other => Err(DomainError::ValidationFailed(format!(
            "Unsupported embedding provider: {other}"
        ))),
    }
}
