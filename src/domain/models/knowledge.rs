//! Knowledge-base domain models
//!
//! Documents are split into chunks on ingest; each chunk carries enough
//! bookkeeping metadata to reassemble its document on search.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata attached to documents and chunks.
pub type Metadata = Map<String, Value>;

/// Metadata key holding the owning document id.
pub const META_DOCUMENT_ID: &str = "document_id";
/// Metadata key holding the owning knowledge-base id.
pub const META_KNOWLEDGE_BASE_ID: &str = "knowledge_base_id";
/// Metadata key holding the chunk id.
pub const META_CHUNK_ID: &str = "chunk_id";
/// Metadata key holding the chunk position within its document.
pub const META_CHUNK_INDEX: &str = "chunk_index";
/// Metadata key holding the number of chunks of the document.
pub const META_TOTAL_CHUNKS: &str = "total_chunks";

/// Bookkeeping keys stripped from search results.
pub const INTERNAL_METADATA_KEYS: [&str; 3] = [META_CHUNK_ID, META_CHUNK_INDEX, META_TOTAL_CHUNKS];

/// Id of chunk `index` of `document_id`.
pub fn chunk_id(document_id: &str, index: usize) -> String {
    format!("{document_id}_chunk_{index}")
}

/// Common prefix of every chunk id of `document_id`.
pub fn chunk_id_prefix(document_id: &str) -> String {
    format!("{document_id}_chunk_")
}

/// Map a cosine distance (0..=2) to a similarity in `[0, 1]`.
pub fn distance_to_similarity(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - (distance / 2.0).min(1.0)).clamp(0.0, 1.0)
}

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Separators tried in order, coarsest first. The empty separator splits
    /// between characters.
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }

    /// Validate the chunking configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err("chunk_overlap must be less than chunk_size".to_string());
        }

        if self.separators.is_empty() {
            return Err("at least one separator is required".to_string());
        }

        Ok(())
    }
}

/// A stored piece of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub knowledge_base_id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Caller supplied metadata
    pub metadata: Metadata,
}

impl KnowledgeChunk {
    /// Metadata as stored in the vector backend: caller keys overlaid with
    /// the bookkeeping keys.
    pub fn stored_metadata(&self) -> Metadata {
        let mut metadata = self.metadata.clone();
        metadata.insert(META_DOCUMENT_ID.to_string(), Value::from(self.document_id.clone()));
        metadata.insert(
            META_KNOWLEDGE_BASE_ID.to_string(),
            Value::from(self.knowledge_base_id.clone()),
        );
        metadata.insert(META_CHUNK_ID.to_string(), Value::from(self.chunk_id.clone()));
        metadata.insert(META_CHUNK_INDEX.to_string(), Value::from(self.chunk_index));
        metadata.insert(META_TOTAL_CHUNKS.to_string(), Value::from(self.total_chunks));
        metadata
    }
}

/// A document reassembled from its retrieved chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub document_id: String,
    pub content: String,
    pub similarity: f32,
    pub chunk_count: usize,
    pub metadata: Metadata,
}

impl RetrievalResult {
    pub fn knowledge_base_id(&self) -> Option<&str> {
        self.metadata.get(META_KNOWLEDGE_BASE_ID).and_then(Value::as_str)
    }
}
