//! SQLite adapters for chunk vector storage.

pub mod connection;
pub mod vector_backend;

pub use connection::{create_pool, create_test_pool, database_url, ConnectionError, PoolConfig};
pub use vector_backend::SqliteVectorBackend;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Metadata;

/// Serialize an embedding as little-endian f32 bytes.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize little-endian f32 bytes.
pub fn bytes_to_embedding(bytes: &[u8]) -> DomainResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(DomainError::SerializationError(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Parse a JSON object column.
pub fn parse_metadata(s: &str) -> DomainResult<Metadata> {
    if s.trim().is_empty() {
        return Ok(Metadata::new());
    }
    Ok(serde_json::from_str(s)?)
}
