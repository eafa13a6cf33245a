//! Embedding provider port.
//!
//! Converts text into dense vectors compared by cosine distance.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Text to vector capability.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "hashing").
    fn name(&self) -> &'static str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>>;

    /// Generate embeddings for several texts, preserving input order.
    async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>>;

    /// Maximum number of texts per single call.
    fn max_batch_size(&self) -> usize;
}
