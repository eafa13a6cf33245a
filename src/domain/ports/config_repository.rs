//! Configuration repository ports.
//!
//! Storage of agent and tool configurations lives outside this crate; these
//! traits are the seam it is reached through.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentConfig, ToolConfig};

/// Source of agent configurations.
#[async_trait]
pub trait AgentConfigRepository: Send + Sync {
    /// Every configuration flagged active.
    async fn get_active_agent_configs(&self) -> DomainResult<Vec<AgentConfig>>;

    /// One configuration by id.
    async fn get_agent_config(&self, id: &str) -> DomainResult<Option<AgentConfig>>;

    /// Every configuration.
    async fn list_agent_configs(&self) -> DomainResult<Vec<AgentConfig>>;

    /// Insert or replace a configuration.
    async fn save_agent_config(&self, config: &AgentConfig) -> DomainResult<()>;
}

/// Source of tool configurations.
#[async_trait]
pub trait ToolRepository: Send + Sync {
    /// Tools for `ids`, in the requested order. Unknown ids are skipped.
    async fn get_tools_by_ids(&self, ids: &[String]) -> DomainResult<Vec<ToolConfig>>;

    /// Insert or replace a tool.
    async fn save_tool(&self, tool: &ToolConfig) -> DomainResult<()>;
}
