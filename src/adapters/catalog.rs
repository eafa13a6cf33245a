//! YAML catalog of agent and tool configurations.
//!
//! ```yaml
//! agents:
//!   - id: support
//!     provider: openai
//!     model: gpt-4o-mini
//!     knowledge_base_ids: [handbook]
//!     tool_ids: [clock]
//!     is_active: true
//! tools:
//!   - id: clock
//!     name: current_time
//!     type: function
//!     function_config:
//!       code: current_time
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentConfig, ToolConfig};
use crate::domain::ports::{AgentConfigRepository, ToolRepository};

/// Contents of a catalog file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
}

impl Catalog {
    /// Read a catalog; a missing file is an empty catalog.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Catalog file not found, starting empty");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let catalog: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        info!(
            path = %path.display(),
            agents = catalog.agents.len(),
            tools = catalog.tools.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let text = serde_yaml::to_string(self).context("Failed to serialize catalog")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write catalog {}", path.display()))
    }
}

/// Catalog-file backed repositories. Saves rewrite the file.
#[derive(Debug)]
pub struct YamlCatalogRepository {
    path: PathBuf,
    catalog: RwLock<Catalog>,
}

impl YamlCatalogRepository {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let catalog = Catalog::load(&path)?;
        Ok(Self {
            path,
            catalog: RwLock::new(catalog),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, catalog: &Catalog) -> DomainResult<()> {
        let path = self.path.clone();
        let snapshot = catalog.clone();
        tokio::task::spawn_blocking(move || snapshot.save(&path))
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?
            .map_err(|e| DomainError::DatabaseError(format!("{e:#}")))
    }
}

#[async_trait]
impl AgentConfigRepository for YamlCatalogRepository {
    async fn get_active_agent_configs(&self) -> DomainResult<Vec<AgentConfig>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.agents.iter().filter(|a| a.is_active).cloned().collect())
    }

    async fn get_agent_config(&self, id: &str) -> DomainResult<Option<AgentConfig>> {
        let catalog = self.catalog.read().await;
        Ok(catalog.agents.iter().find(|a| a.id == id).cloned())
    }

    async fn list_agent_configs(&self) -> DomainResult<Vec<AgentConfig>> {
        Ok(self.catalog.read().await.agents.clone())
    }

    async fn save_agent_config(&self, config: &AgentConfig) -> DomainResult<()> {
        let mut catalog = self.catalog.write().await;
        match catalog.agents.iter_mut().find(|a| a.id == config.id) {
            Some(existing) => *existing = config.clone(),
            None => catalog.agents.push(config.clone()),
        }
        self.persist(&catalog).await
    }
}

#[async_trait]
impl ToolRepository for YamlCatalogRepository {
    async fn get_tools_by_ids(&self, ids: &[String]) -> DomainResult<Vec<ToolConfig>> {
        let catalog = self.catalog.read().await;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match catalog.tools.iter().find(|t| &t.id == id) {
                Some(tool) => found.push(tool.clone()),
                None => warn!(tool_id = %id, "Tool configuration not found, skipping"),
            }
        }
        Ok(found)
    }

    async fn save_tool(&self, tool: &ToolConfig) -> DomainResult<()> {
        let mut catalog = self.catalog.write().await;
        match catalog.tools.iter_mut().find(|t| t.id == tool.id) {
            Some(existing) => *existing = tool.clone(),
            None => catalog.tools.push(tool.clone()),
        }
        self.persist(&catalog).await
    }
}
