use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentConfig, ToolConfig};
use crate::domain::ports::{AgentConfigRepository, ToolRepository};

/// Agent configurations held in a map.
#[derive(Debug, Default)]
pub struct InMemoryAgentConfigRepository {
    configs: RwLock<BTreeMap<String, AgentConfig>>,
}

impl InMemoryAgentConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configs(configs: impl IntoIterator<Item = AgentConfig>) -> Self {
        let configs = configs.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self {
            configs: RwLock::new(configs),
        }
    }
}

#[async_trait]
impl AgentConfigRepository for InMemoryAgentConfigRepository {
    async fn get_active_agent_configs(&self) -> DomainResult<Vec<AgentConfig>> {
        let configs = self.configs.read().await;
        Ok(configs.values().filter(|c| c.is_active).cloned().collect())
    }

    async fn get_agent_config(&self, id: &str) -> DomainResult<Option<AgentConfig>> {
        Ok(self.configs.read().await.get(id).cloned())
    }

    async fn list_agent_configs(&self) -> DomainResult<Vec<AgentConfig>> {
        Ok(self.configs.read().await.values().cloned().collect())
    }

    async fn save_agent_config(&self, config: &AgentConfig) -> DomainResult<()> {
        self.configs
            .write()
            .await
            .insert(config.id.clone(), config.clone());
        Ok(())
    }
}

/// Tool configurations held in a map.
#[derive(Debug, Default)]
pub struct InMemoryToolRepository {
    tools: RwLock<BTreeMap<String, ToolConfig>>,
}

impl InMemoryToolRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(tools: impl IntoIterator<Item = ToolConfig>) -> Self {
        let tools = tools.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            tools: RwLock::new(tools),
        }
    }

    pub async fn list_tools(&self) -> Vec<ToolConfig> {
        self.tools.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ToolRepository for InMemoryToolRepository {
    async fn get_tools_by_ids(&self, ids: &[String]) -> DomainResult<Vec<ToolConfig>> {
        let tools = self.tools.read().await;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match tools.get(id) {
                Some(tool) => found.push(tool.clone()),
                None => warn!(tool_id = %id, "Tool configuration not found, skipping"),
            }
        }
        Ok(found)
    }

    async fn save_tool(&self, tool: &ToolConfig) -> DomainResult<()> {
        self.tools.write().await.insert(tool.id.clone(), tool.clone());
        Ok(())
    }
}
