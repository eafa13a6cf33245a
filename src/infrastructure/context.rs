//! Wiring of adapters and services from a loaded [`Config`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::catalog::YamlCatalogRepository;
use crate::adapters::embeddings::create_embedding_provider;
use crate::adapters::memory::InMemoryVectorBackend;
use crate::adapters::models::ProviderModelFactory;
use crate::adapters::sqlite::{create_pool, database_url, PoolConfig, SqliteVectorBackend};
use crate::adapters::tools::FunctionRegistry;
use crate::domain::models::{ChunkingConfig, Config, VectorBackendKind};
use crate::domain::ports::{AgentConfigRepository, ToolRepository, VectorBackend};
use crate::services::{
    AgentFactory, AgentRegistry, AgentRuntimeOptions, AgentService, KnowledgeStore, TextSplitter,
    ToolBinder,
};

/// Fully wired application services.
pub struct AppContext {
    pub config: Config,
    pub catalog: Arc<YamlCatalogRepository>,
    pub knowledge: Arc<KnowledgeStore>,
    pub registry: Arc<AgentRegistry>,
    pub agents: AgentService,
}

impl AppContext {
    /// Build every service the configuration describes.
    pub async fn build(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("genagent/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let backend = open_backend(&config).await?;
        let embeddings = create_embedding_provider(&config.knowledge.embedding, http.clone())
            .context("Failed to create embedding provider")?;
        let splitter = TextSplitter::new(&ChunkingConfig::new(
            config.knowledge.chunk_size,
            config.knowledge.chunk_overlap,
        ))
        .context("Invalid chunking configuration")?;
        let knowledge = Arc::new(KnowledgeStore::new(
            backend,
            embeddings,
            splitter,
            Duration::from_secs(config.knowledge.timeout_secs),
        ));

        let catalog = Arc::new(
            YamlCatalogRepository::open(&config.catalog_path).context("Failed to open agent catalog")?,
        );

        let factory = AgentFactory::new(
            Arc::new(ProviderModelFactory::new(config.providers.clone(), http.clone())),
            ToolBinder::new(http, Arc::new(FunctionRegistry::with_builtins())),
            AgentRuntimeOptions::from(&config.runtime),
        );
        let registry = Arc::new(AgentRegistry::new(factory));

        let agents = AgentService::new(
            Arc::clone(&registry),
            Arc::clone(&knowledge),
            Arc::clone(&catalog) as Arc<dyn AgentConfigRepository>,
            Arc::clone(&catalog) as Arc<dyn ToolRepository>,
            config.knowledge.top_k,
        );

        info!(
            backend = knowledge.backend().name(),
            catalog = %config.catalog_path,
            "Application context ready"
        );

        Ok(Self {
            config,
            catalog,
            knowledge,
            registry,
            agents,
        })
    }
}

async fn open_backend(config: &Config) -> Result<Arc<dyn VectorBackend>> {
    match config.knowledge.backend {
        VectorBackendKind::Memory => Ok(Arc::new(InMemoryVectorBackend::new())),
        VectorBackendKind::Sqlite => {
            let url = database_url(&config.database.path);
            let pool = create_pool(&url, &PoolConfig::from(&config.database))
                .await
                .with_context(|| format!("Failed to open database {}", config.database.path))?;
            let backend = SqliteVectorBackend::new(pool)
                .await
                .context("Failed to initialize chunk table")?;
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_with_sqlite_and_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("knowledge.db").display().to_string();
        config.catalog_path = dir.path().join("catalog.yaml").display().to_string();

        let context = AppContext::build(config).await.unwrap();
        assert_eq!(context.knowledge.backend().name(), "sqlite");
        assert!(context.registry.is_empty().await);

        let stored = context
            .knowledge
            .try_ingest("doc", "kb", "Some searchable text.", Default::default())
            .await
            .unwrap();
        assert_eq!(stored, 1);
    }
}
