use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::ports::{cosine_distance, MetadataFilter, ScoredRecord, VectorBackend, VectorRecord};

/// Brute-force vector store held in a map. Not persistent.
#[derive(Debug, Default)]
pub struct InMemoryVectorBackend {
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorBackend for InMemoryVectorBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> DomainResult<()> {
        let mut stored = self.records.write().await;
        for record in records {
            stored.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query_nearest(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> DomainResult<Vec<ScoredRecord>> {
        let stored = self.records.read().await;
        let mut scored: Vec<ScoredRecord> = stored
            .values()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| ScoredRecord {
                id: r.id.clone(),
                content: r.content.clone(),
                metadata: r.metadata.clone(),
                distance: cosine_distance(vector, &r.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn ids_matching(&self, filter: &MetadataFilter) -> DomainResult<Vec<String>> {
        let stored = self.records.read().await;
        Ok(stored
            .values()
            .filter(|r| filter.matches(&r.metadata))
            .map(|r| r.id.clone())
            .collect())
    }

    async fn list_ids(&self) -> DomainResult<Vec<String>> {
        Ok(self.records.read().await.keys().cloned().collect())
    }

    async fn delete_by_ids(&self, ids: &[String]) -> DomainResult<usize> {
        let mut stored = self.records.write().await;
        Ok(ids.iter().filter(|id| stored.remove(*id).is_some()).count())
    }

    async fn delete_by_filter(&self, filter: &MetadataFilter) -> DomainResult<usize> {
        let mut stored = self.records.write().await;
        let before = stored.len();
        stored.retain(|_, r| !filter.matches(&r.metadata));
        Ok(before - stored.len())
    }

    async fn count(&self) -> DomainResult<usize> {
        Ok(self.records.read().await.len())
    }
}
