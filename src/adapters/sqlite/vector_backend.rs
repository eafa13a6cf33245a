//! SQLite-backed vector store.
//!
//! Chunks are rows with a JSON metadata column and a little-endian f32
//! embedding blob. Similarity is a full scan with cosine distance computed in
//! Rust.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use tracing::debug;

use super::{bytes_to_embedding, embedding_to_bytes, parse_metadata};
use crate::domain::errors::DomainResult;
use crate::domain::ports::{cosine_distance, MetadataFilter, ScoredRecord, VectorBackend, VectorRecord};

const SCHEMA: [&str; 2] = [
    r"CREATE TABLE IF NOT EXISTS knowledge_chunks (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        embedding BLOB NOT NULL,
        updated_at TEXT NOT NULL
    )",
    r"CREATE INDEX IF NOT EXISTS idx_knowledge_chunks_document
        ON knowledge_chunks (json_extract(metadata, '$.document_id'))",
];

/// Vector backend persisting chunks in the `knowledge_chunks` table.
#[derive(Debug, Clone)]
pub struct SqliteVectorBackend {
    pool: SqlitePool,
}

/// Bind value for a metadata equality filter.
enum FilterValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FilterValue {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Integer(i64::from(*b)),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Real(n.as_f64().unwrap_or_default()), Self::Integer),
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    const fn clause(&self) -> &'static str {
        match self {
            Self::Null => "json_type(metadata, ?) = 'null'",
            _ => "json_extract(metadata, ?) = ?",
        }
    }
}

fn json_path(key: &str) -> String {
    if key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("$.{key}")
    } else {
        format!("$.\"{}\"", key.replace('"', "\\\""))
    }
}

fn bind_filter<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    filter: &MetadataFilter,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let query = query.bind(json_path(&filter.key));
    match FilterValue::from_json(&filter.value) {
        FilterValue::Null => query,
        FilterValue::Integer(i) => query.bind(i),
        FilterValue::Real(f) => query.bind(f),
        FilterValue::Text(s) => query.bind(s),
    }
}

fn filter_sql(filter: &MetadataFilter) -> &'static str {
    FilterValue::from_json(&filter.value).clause()
}

impl SqliteVectorBackend {
    /// Wrap a pool, creating the chunk table when missing.
    pub async fn new(pool: SqlitePool) -> DomainResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn scored(row: &SqliteRow, query: &[f32]) -> DomainResult<ScoredRecord> {
        let embedding_bytes: Vec<u8> = row.try_get("embedding")?;
        let embedding = bytes_to_embedding(&embedding_bytes)?;
        let metadata_json: String = row.try_get("metadata")?;

        Ok(ScoredRecord {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            metadata: parse_metadata(&metadata_json)?,
            distance: cosine_distance(query, &embedding),
        })
    }
}

#[async_trait]
impl VectorBackend for SqliteVectorBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> DomainResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for record in &records {
            let metadata = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r"INSERT INTO knowledge_chunks (id, content, metadata, embedding, updated_at)
                  VALUES (?, ?, ?, ?, ?)
                  ON CONFLICT(id) DO UPDATE SET
                      content = excluded.content,
                      metadata = excluded.metadata,
                      embedding = excluded.embedding,
                      updated_at = excluded.updated_at",
            )
            .bind(&record.id)
            .bind(&record.content)
            .bind(metadata)
            .bind(embedding_to_bytes(&record.vector))
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(count = records.len(), "Upserted chunk rows");
        Ok(())
    }

    async fn query_nearest(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> DomainResult<Vec<ScoredRecord>> {
        let rows = match filter {
            Some(filter) => {
                let sql = format!(
                    "SELECT id, content, metadata, embedding FROM knowledge_chunks WHERE {}",
                    filter_sql(filter)
                );
                bind_filter(sqlx::query(&sql), filter)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT id, content, metadata, embedding FROM knowledge_chunks")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut scored = rows
            .iter()
            .map(|row| Self::scored(row, vector))
            .collect::<DomainResult<Vec<_>>>()?;

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
        let sql = format!("SELECT id FROM knowledge_chunks WHERE {}", filter_sql(filter));
        let rows = bind_filter(sqlx::query(&sql), filter)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map_err(Into::into))
            .collect()
    }

    async fn list_ids(&self) -> DomainResult<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM knowledge_chunks")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("id").map_err(Into::into))
            .collect()
    }

    async fn delete_by_ids(&self, ids: &[String]) -> DomainResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0_u64;

        for id in ids {
            removed += sqlx::query("DELETE FROM knowledge_chunks WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        Ok(usize::try_from(removed).unwrap_or(usize::MAX))
    }

    async fn delete_by_filter(&self, filter: &MetadataFilter) -> DomainResult<usize> {
        let sql = format!("DELETE FROM knowledge_chunks WHERE {}", filter_sql(filter));
        let removed = bind_filter(sqlx::query(&sql), filter)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(usize::try_from(removed).unwrap_or(usize::MAX))
    }

    async fn count(&self) -> DomainResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
