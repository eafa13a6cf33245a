//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use genagent::adapters::embeddings::HashingEmbeddingProvider;
use genagent::adapters::memory::{
    InMemoryAgentConfigRepository, InMemoryToolRepository, InMemoryVectorBackend,
};
use genagent::adapters::models::{MockChatModel, MockModelFactory};
use genagent::domain::errors::{DomainError, DomainResult};
use genagent::domain::ports::{AgentConfigRepository, MetadataFilter, ScoredRecord, VectorBackend, VectorRecord};
use genagent::domain::models::{AgentConfig, ToolConfig};
use genagent::services::{
    AgentFactory, AgentRegistry, AgentRuntimeOptions, AgentService, KnowledgeStore, TextSplitter,
    ToolBinder,
};

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Create a temporary test database path
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let db_path = dir.path().join("test.db");
    (dir, db_path)
}

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Knowledge store over an in-memory backend and local embeddings.
pub fn memory_store() -> KnowledgeStore {
    store_with_backend(Arc::new(InMemoryVectorBackend::new()))
}

pub fn store_with_backend(backend: Arc<dyn VectorBackend>) -> KnowledgeStore {
    KnowledgeStore::new(
        backend,
        Arc::new(HashingEmbeddingProvider::new(384).expect("embedding provider")),
        TextSplitter::default(),
        Duration::from_secs(5),
    )
}

/// Registry whose agents all share `model`. The provider "broken" is
/// refused.
pub fn mock_registry(model: Arc<MockChatModel>, options: AgentRuntimeOptions) -> AgentRegistry {
    AgentRegistry::new(AgentFactory::new(
        Arc::new(MockModelFactory::new(model).rejecting("broken")),
        ToolBinder::default(),
        options,
    ))
}

pub struct ServiceFixture {
    pub service: AgentService,
    pub model: Arc<MockChatModel>,
    pub knowledge: Arc<KnowledgeStore>,
    pub configs: Arc<InMemoryAgentConfigRepository>,
}

pub fn service_fixture(agents: Vec<AgentConfig>, tools: Vec<ToolConfig>) -> ServiceFixture {
    let model = Arc::new(MockChatModel::default());
    let registry = Arc::new(mock_registry(Arc::clone(&model), AgentRuntimeOptions::default()));
    let knowledge = Arc::new(memory_store());
    let configs = Arc::new(InMemoryAgentConfigRepository::with_configs(agents));

    let service = AgentService::new(
        registry,
        Arc::clone(&knowledge),
        Arc::clone(&configs) as Arc<dyn AgentConfigRepository>,
        Arc::new(InMemoryToolRepository::with_tools(tools)),
        5,
    );

    ServiceFixture {
        service,
        model,
        knowledge,
        configs,
    }
}

/// Mock agent configuration.
pub fn mock_agent(id: &str) -> AgentConfig {
    AgentConfig::new(id, "mock", "mock-model").with_system_prompt(format!("You are {id}."))
}

/// Backend whose every call fails.
#[derive(Debug, Default)]
pub struct FailingBackend;

fn unavailable() -> DomainError {
    DomainError::DatabaseError("connection refused".to_string())
}

#[async_trait]
impl VectorBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn upsert(&self, _records: Vec<VectorRecord>) -> DomainResult<()> {
        Err(unavailable())
    }

    async fn query_nearest(
        &self,
        _vector: &[f32],
        _k: usize,
        _filter: Option<&MetadataFilter>,
    ) -> DomainResult<Vec<ScoredRecord>> {
        Err(unavailable())
    }

    async fn ids_matching(&self, _filter: &MetadataFilter) -> DomainResult<Vec<String>> {
        Err(unavailable())
    }

    async fn list_ids(&self) -> DomainResult<Vec<String>> {
        Err(unavailable())
    }

    async fn delete_by_ids(&self, _ids: &[String]) -> DomainResult<usize> {
        Err(unavailable())
    }

    async fn delete_by_filter(&self, _filter: &MetadataFilter) -> DomainResult<usize> {
        Err(unavailable())
    }

    async fn count(&self) -> DomainResult<usize> {
        Err(unavailable())
    }
}

/// A paragraph of roughly `chars` characters built from `tag`-prefixed words.
pub fn paragraph(tag: &str, chars: usize) -> String {
    let mut text = String::new();
    let mut i = 0;
    while text.len() < chars {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&format!("{tag}{i}"));
        i += 1;
    }
    text
}
