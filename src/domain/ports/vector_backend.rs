//! Vector storage port used by the knowledge store.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::DomainResult;
use crate::domain::models::Metadata;

/// A vector with its text and metadata, keyed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub metadata: Metadata,
}

/// A record returned by a nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    /// Cosine distance to the query vector (lower is closer)
    pub distance: f32,
}

/// Equality filter on one metadata key.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFilter {
    pub key: String,
    pub value: Value,
}

impl MetadataFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        metadata.get(&self.key) == Some(&self.value)
    }
}

/// Persistent or in-memory vector store.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<VectorRecord>) -> DomainResult<()>;

    /// The `k` records closest to `vector`, closest first.
    async fn query_nearest(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> DomainResult<Vec<ScoredRecord>>;

    /// Ids of records whose metadata matches `filter`.
    async fn ids_matching(&self, filter: &MetadataFilter) -> DomainResult<Vec<String>>;

    /// Every stored id.
    async fn list_ids(&self) -> DomainResult<Vec<String>>;

    /// Delete records by id, returning how many existed.
    async fn delete_by_ids(&self, ids: &[String]) -> DomainResult<usize>;

    /// Delete records matching `filter`, returning how many existed.
    async fn delete_by_filter(&self, filter: &MetadataFilter) -> DomainResult<usize>;

    /// Number of stored records.
    async fn count(&self) -> DomainResult<usize>;
}

/// Cosine distance between two vectors (1 - cosine similarity).
///
/// Mismatched lengths and zero vectors are maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return f32::MAX;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return f32::MAX;
    }

    1.0 - (dot / denom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0], &[1.0, 2.0]) - f32::MAX).abs() < f32::EPSILON);
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - f32::MAX).abs() < f32::EPSILON);
    }

    #[test]
    fn test_filter_matches() {
        let mut metadata = Metadata::new();
        metadata.insert("document_id".into(), Value::from("d1"));
        assert!(MetadataFilter::eq("document_id", "d1").matches(&metadata));
        assert!(!MetadataFilter::eq("document_id", "d2").matches(&metadata));
        assert!(!MetadataFilter::eq("missing", "d1").matches(&metadata));
    }
}
