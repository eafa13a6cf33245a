//! Integration tests for ingestion and retrieval through the knowledge store.

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use common::{memory_store, paragraph, setup_test_logging, store_with_backend, FailingBackend};
use genagent::adapters::embeddings::HashingEmbeddingProvider;
use genagent::adapters::memory::InMemoryVectorBackend;
use genagent::domain::errors::DomainError;
use genagent::domain::models::Metadata;
use genagent::domain::ports::{EmbeddingProvider, MetadataFilter, VectorBackend};

fn kbs(ids: &[&str]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn test_three_paragraphs_reassemble_in_order() {
    setup_test_logging();
    let store = memory_store();

    let text = [
        paragraph("alpha", 830),
        paragraph("beta", 830),
        paragraph("gamma", 830),
    ]
    .join("\n\n");

    let chunks = store.try_ingest("doc", "kb", &text, Metadata::new()).await.unwrap();
    assert!((3..=4).contains(&chunks), "got {chunks} chunks");

    let results = store.search("gamma10 gamma11 gamma12", 5, &[]).await;
    assert_eq!(results.len(), 1);
    let doc = &results[0];
    assert_eq!(doc.document_id, "doc");
    assert!(doc.content.starts_with("alpha0"), "content: {}", &doc.content[..40]);
    assert_eq!(doc.knowledge_base_id(), Some("kb"));
}

#[tokio::test]
async fn test_chunks_share_total_and_follow_size_formula() {
    let backend = Arc::new(InMemoryVectorBackend::new());
    let store = store_with_backend(Arc::clone(&backend) as Arc<dyn VectorBackend>);

    let text = paragraph("w", 5000);
    let chunks = store.try_ingest("long", "kb", &text, Metadata::new()).await.unwrap();

    let expected = (text.chars().count() - 200).div_ceil(800);
    assert!(
        chunks.abs_diff(expected) <= 1,
        "expected about {expected} chunks, got {chunks}"
    );

    let embedder = HashingEmbeddingProvider::new(384).unwrap();
    let vector = embedder.embed("w1").await.unwrap();
    let filter = MetadataFilter::eq("document_id", "long");
    let stored = backend.query_nearest(&vector, 100, Some(&filter)).await.unwrap();

    assert_eq!(stored.len(), chunks);
    for record in &stored {
        assert_eq!(record.metadata["total_chunks"], json!(chunks));
        assert!(record.id.starts_with("long_chunk_"));
    }
}

#[tokio::test]
async fn test_reingest_replaces_previous_chunks() {
    let store = memory_store();
    store
        .try_ingest("doc", "kb", &paragraph("old", 2500), Metadata::new())
        .await
        .unwrap();

    let chunks = store
        .try_ingest("doc", "kb", "A short replacement text.", Metadata::new())
        .await
        .unwrap();
    assert_eq!(chunks, 1);
    assert_eq!(store.backend().count().await.unwrap(), 1);

    let results = store.search("replacement", 5, &[]).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content, "A short replacement text.");
}

#[tokio::test]
async fn test_delete_then_search_finds_nothing() {
    let store = memory_store();
    store
        .try_ingest("doc", "kb", "Refunds are issued within 30 days.", Metadata::new())
        .await
        .unwrap();

    assert_eq!(store.try_delete("doc").await.unwrap(), 1);
    assert!(store.search("refunds", 5, &[]).await.is_empty());
    assert!(store.delete("doc").await, "deleting nothing succeeds");
}

#[tokio::test]
async fn test_search_is_scoped_to_knowledge_bases() {
    let store = memory_store();
    store
        .try_ingest("a1", "kb-a", "Shipping takes five days.", Metadata::new())
        .await
        .unwrap();
    store
        .try_ingest("b1", "kb-b", "Shipping costs ten dollars.", Metadata::new())
        .await
        .unwrap();

    let scoped = store.search("shipping", 5, &kbs(&["kb-a"])).await;
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].document_id, "a1");

    let both = store.search("shipping", 5, &kbs(&["kb-a", "kb-b"])).await;
    assert_eq!(both.len(), 2);

    assert!(store.search("shipping", 5, &kbs(&["kb-c"])).await.is_empty());
}

#[tokio::test]
async fn test_similarity_bounds_and_ordering() {
    let store = memory_store();
    for (id, text) in [
        ("cats", "Cats are small domesticated felines."),
        ("dogs", "Dogs are loyal domesticated canines."),
        ("rust", "Rust is a systems programming language."),
    ] {
        store.try_ingest(id, "kb", text, Metadata::new()).await.unwrap();
    }

    let results = store.search("Rust systems programming language", 3, &[]).await;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].document_id, "rust");
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    for result in &results {
        assert!((0.0..=1.0).contains(&result.similarity));
    }

    assert_eq!(store.search("language", 1, &[]).await.len(), 1);
}

#[tokio::test]
async fn test_caller_metadata_is_kept_and_bookkeeping_stripped() {
    let store = memory_store();
    let mut metadata = Metadata::new();
    metadata.insert("title".to_string(), Value::from("Handbook"));

    store
        .try_ingest("hb", "kb", "Vacation policy: 25 days.", metadata)
        .await
        .unwrap();

    let results = store.search("vacation", 5, &[]).await;
    let meta = &results[0].metadata;
    assert_eq!(meta["title"], json!("Handbook"));
    assert_eq!(meta["document_id"], json!("hb"));
    assert!(!meta.contains_key("chunk_id"));
    assert!(!meta.contains_key("chunk_index"));
    assert!(!meta.contains_key("total_chunks"));
}

#[tokio::test]
async fn test_empty_document_is_invalid() {
    let store = memory_store();
    let err = store
        .try_ingest("blank", "kb", "   \n\n  ", Metadata::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidDocument { .. }));
    assert!(!store.ingest("blank", "kb", "", Metadata::new()).await);
}

#[tokio::test]
async fn test_backend_failure_degrades() {
    let store = store_with_backend(Arc::new(FailingBackend));

    assert!(!store.ingest("doc", "kb", "content", Metadata::new()).await);
    assert!(!store.delete("doc").await);
    assert!(store.search("content", 5, &[]).await.is_empty());

    let err = store.try_search("content", 5, &[]).await.unwrap_err();
    assert!(matches!(err, DomainError::RetrievalUnavailable(_)));
}

#[tokio::test]
async fn test_concurrent_ingest_of_distinct_documents() {
    let store = Arc::new(memory_store());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .try_ingest(&format!("doc-{i}"), "kb", &paragraph(&format!("d{i}x"), 1500), Metadata::new())
                    .await
            })
        })
        .collect();

    let mut total = 0;
    for handle in handles {
        total += handle.await.unwrap().unwrap();
    }
    assert_eq!(store.backend().count().await.unwrap(), total);
}
