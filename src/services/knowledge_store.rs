//! Knowledge-base ingestion and retrieval.
//!
//! Documents are split into overlapping chunks, embedded and stored in a
//! [`VectorBackend`]. Searches over-fetch chunks, regroup them per document
//! and reassemble each document's text in chunk order.
//!
//! Every operation has a strict `try_*` form returning a typed error and a
//! forgiving form that logs and degrades to `false` or an empty result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::text_splitter::TextSplitter;
use super::timeout::bounded;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::knowledge::{
    chunk_id, chunk_id_prefix, distance_to_similarity, INTERNAL_METADATA_KEYS, META_CHUNK_INDEX,
    META_DOCUMENT_ID, META_KNOWLEDGE_BASE_ID,
};
use crate::domain::models::{KnowledgeChunk, Metadata, RetrievalResult};
use crate::domain::ports::{EmbeddingProvider, MetadataFilter, ScoredRecord, VectorBackend, VectorRecord};

/// Chunked, embedding-backed document store.
pub struct KnowledgeStore {
    backend: Arc<dyn VectorBackend>,
    embeddings: Arc<dyn EmbeddingProvider>,
    splitter: TextSplitter,
    timeout: Duration,
    document_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KnowledgeStore {
    pub fn new(
        backend: Arc<dyn VectorBackend>,
        embeddings: Arc<dyn EmbeddingProvider>,
        splitter: TextSplitter,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            embeddings,
            splitter,
            timeout,
            document_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn VectorBackend> {
        &self.backend
    }

    /// Ingest a document, replacing any previous version. Returns `false` on
    /// any failure.
    pub async fn ingest(&self, document_id: &str, knowledge_base_id: &str, content: &str, metadata: Metadata) -> bool {
        match self.try_ingest(document_id, knowledge_base_id, content, metadata).await {
            Ok(_) => true,
            Err(e) => {
                error!(document_id, knowledge_base_id, error = %e, "Failed to ingest document");
                false
            }
        }
    }

    /// Ingest a document, replacing any previous version. Returns the number
    /// of chunks stored.
    pub async fn try_ingest(
        &self,
        document_id: &str,
        knowledge_base_id: &str,
        content: &str,
        metadata: Metadata,
    ) -> DomainResult<usize> {
        if document_id.trim().is_empty() {
            return Err(DomainError::ValidationFailed("document_id must not be empty".to_string()));
        }

        let lock = self.document_lock(document_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.ingest_locked(document_id, knowledge_base_id, content, metadata)
                .await
        };
        self.release_document_lock(document_id, lock).await;
        result
    }

    async fn ingest_locked(
        &self,
        document_id: &str,
        knowledge_base_id: &str,
        content: &str,
        metadata: Metadata,
    ) -> DomainResult<usize> {
        self.delete_locked(document_id).await?;

        let texts = self.splitter.split_text(content);
        if texts.is_empty() {
            return Err(DomainError::InvalidDocument {
                document_id: document_id.to_string(),
                reason: "content produced no chunks".to_string(),
            });
        }

        let vectors = self.embed_all(&texts).await?;
        let total_chunks = texts.len();

        let records: Vec<VectorRecord> = texts
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (content, embedding))| {
                let chunk = KnowledgeChunk {
                    chunk_id: chunk_id(document_id, index),
                    document_id: document_id.to_string(),
                    knowledge_base_id: knowledge_base_id.to_string(),
                    content,
                    embedding,
                    chunk_index: index,
                    total_chunks,
                    metadata: metadata.clone(),
                };
                VectorRecord {
                    metadata: chunk.stored_metadata(),
                    id: chunk.chunk_id,
                    vector: chunk.embedding,
                    content: chunk.content,
                }
            })
            .collect();

        bounded("vector upsert", self.timeout, self.backend.upsert(records))
            .await
            .map_err(into_unavailable)?;

        info!(
            document_id,
            knowledge_base_id,
            chunks = total_chunks,
            backend = self.backend.name(),
            "Ingested document"
        );
        Ok(total_chunks)
    }

    async fn embed_all(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let batch_size = self.embeddings.max_batch_size().max(1);
        let batches = texts.chunks(batch_size).map(|batch| {
            bounded("embedding", self.timeout, self.embeddings.embed_batch(batch))
        });
        let vectors: Vec<Vec<f32>> = try_join_all(batches)
            .await
            .map_err(into_unavailable)?
            .into_iter()
            .flatten()
            .collect();

        if vectors.len() != texts.len() {
            return Err(DomainError::RetrievalUnavailable(format!(
                "embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    /// Delete every chunk of a document. Returns `false` on failure; a
    /// document with no chunks deletes successfully.
    pub async fn delete(&self, document_id: &str) -> bool {
        match self.try_delete(document_id).await {
            Ok(_) => true,
            Err(e) => {
                error!(document_id, error = %e, "Failed to delete document");
                false
            }
        }
    }

    /// Delete every chunk of a document, returning how many were removed.
    pub async fn try_delete(&self, document_id: &str) -> DomainResult<usize> {
        let lock = self.document_lock(document_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.delete_locked(document_id).await
        };
        self.release_document_lock(document_id, lock).await;
        result
    }

    async fn delete_locked(&self, document_id: &str) -> DomainResult<usize> {
        let filter = MetadataFilter::eq(META_DOCUMENT_ID, document_id);
        let mut ids = match bounded("vector lookup", self.timeout, self.backend.ids_matching(&filter)).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(document_id, error = %e, "Metadata lookup failed, scanning ids");
                Vec::new()
            }
        };

        if ids.is_empty() {
            let prefix = chunk_id_prefix(document_id);
            ids = bounded("vector scan", self.timeout, self.backend.list_ids())
                .await
                .map_err(into_unavailable)?
                .into_iter()
                .filter(|id| id.starts_with(&prefix))
                .collect();
        }

        if ids.is_empty() {
            return Ok(0);
        }

        let removed = bounded("vector delete", self.timeout, self.backend.delete_by_ids(&ids))
            .await
            .map_err(into_unavailable)?;
        debug!(document_id, removed, "Deleted document chunks");
        Ok(removed)
    }

    /// Search documents similar to `query`. Returns an empty list on failure.
    pub async fn search(&self, query: &str, limit: usize, knowledge_base_ids: &[String]) -> Vec<RetrievalResult> {
        match self.try_search(query, limit, knowledge_base_ids).await {
            Ok(results) => results,
            Err(e) => {
                error!(error = %e, "Knowledge search failed");
                Vec::new()
            }
        }
    }

    /// Search documents similar to `query`, best first, at most `limit`.
    /// An empty `knowledge_base_ids` searches every knowledge base.
    pub async fn try_search(
        &self,
        query: &str,
        limit: usize,
        knowledge_base_ids: &[String],
    ) -> DomainResult<Vec<RetrievalResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let vector = bounded("embedding", self.timeout, self.embeddings.embed(query))
            .await
            .map_err(into_unavailable)?;
        let hits = bounded(
            "vector query",
            self.timeout,
            self.backend.query_nearest(&vector, limit.saturating_mul(3), None),
        )
        .await
        .map_err(into_unavailable)?;

        let mut results = group_by_document(hits, knowledge_base_ids);
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        debug!(results = results.len(), limit, "Knowledge search complete");
        Ok(results)
    }

    async fn document_lock(&self, document_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.document_locks.lock().await;
        Arc::clone(locks.entry(document_id.to_string()).or_default())
    }

    async fn release_document_lock(&self, document_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.document_locks.lock().await;
        // One reference in the map plus ours means nobody else is waiting.
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(document_id);
        }
    }
}

/// Backend and embedding failures surface as `RetrievalUnavailable`;
/// timeouts keep their own kind.
fn into_unavailable(err: DomainError) -> DomainError {
    match err {
        DomainError::Timeout { .. } | DomainError::RetrievalUnavailable(_) => err,
        other => DomainError::RetrievalUnavailable(other.to_string()),
    }
}

struct DocumentGroup {
    document_id: String,
    chunks: Vec<(u64, String)>,
    best_distance: f32,
    metadata: Metadata,
}

fn document_id_of(record: &ScoredRecord) -> String {
    record
        .metadata
        .get(META_DOCUMENT_ID)
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| record.id.rsplit_once("_chunk_").map(|(doc, _)| doc.to_string()))
        .unwrap_or_else(|| record.id.clone())
}

fn group_by_document(hits: Vec<ScoredRecord>, knowledge_base_ids: &[String]) -> Vec<RetrievalResult> {
    let mut groups: Vec<DocumentGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for hit in hits {
        if !knowledge_base_ids.is_empty() {
            let kb = hit.metadata.get(META_KNOWLEDGE_BASE_ID).and_then(Value::as_str);
            if !kb.is_some_and(|kb| knowledge_base_ids.iter().any(|id| id == kb)) {
                continue;
            }
        }

        let document_id = document_id_of(&hit);
        let chunk_index = hit
            .metadata
            .get(META_CHUNK_INDEX)
            .and_then(Value::as_u64)
            .unwrap_or_default();

        match index.get(&document_id) {
            Some(&slot) => {
                let group = &mut groups[slot];
                group.best_distance = group.best_distance.min(hit.distance);
                group.chunks.push((chunk_index, hit.content));
            }
            None => {
                index.insert(document_id.clone(), groups.len());
                groups.push(DocumentGroup {
                    document_id,
                    chunks: vec![(chunk_index, hit.content)],
                    best_distance: hit.distance,
                    metadata: hit.metadata,
                });
            }
        }
    }

    groups
        .into_iter()
        .map(|mut group| {
            group.chunks.sort_by_key(|(i, _)| *i);
            let mut metadata = group.metadata;
            for key in INTERNAL_METADATA_KEYS {
                metadata.remove(key);
            }
            RetrievalResult {
                document_id: group.document_id,
                chunk_count: group.chunks.len(),
                content: group
                    .chunks
                    .into_iter()
                    .map(|(_, content)| content)
                    .collect::<Vec<_>>()
                    .join("\n"),
                similarity: distance_to_similarity(group.best_distance),
                metadata,
            }
        })
        .collect()
}

/// Render search results as numbered source blocks for a prompt.
pub fn format_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let title = result
                .metadata
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(&result.document_id);
            format!("[Source {}: {}]\n{}", i + 1, title, result.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
