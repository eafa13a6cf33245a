//! Agent operations exposed to callers: toggling agents on and off and
//! answering queries with knowledge-base context.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentConfig, QueryResult};
use crate::domain::ports::{AgentConfigRepository, ToolRepository};
use crate::services::agent_registry::{AgentRegistry, WarmStartReport};
use crate::services::knowledge_store::{format_context, KnowledgeStore};

/// Result of [`AgentService::switch_agent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchOutcome {
    pub agent_id: String,
    pub active: bool,
    pub message: String,
}

/// Coordinates the registry, the knowledge store and the configuration
/// repositories.
pub struct AgentService {
    registry: Arc<AgentRegistry>,
    knowledge: Arc<KnowledgeStore>,
    configs: Arc<dyn AgentConfigRepository>,
    tools: Arc<dyn ToolRepository>,
    top_k: usize,
}

impl AgentService {
    pub fn new(
        registry: Arc<AgentRegistry>,
        knowledge: Arc<KnowledgeStore>,
        configs: Arc<dyn AgentConfigRepository>,
        tools: Arc<dyn ToolRepository>,
        top_k: usize,
    ) -> Self {
        Self {
            registry,
            knowledge,
            configs,
            tools,
            top_k,
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeStore> {
        &self.knowledge
    }

    /// Register every configuration flagged active.
    pub async fn warm_start(&self) -> DomainResult<WarmStartReport> {
        self.registry
            .warm_start(self.configs.as_ref(), self.tools.as_ref())
            .await
    }

    /// Flip an agent between on and off, persisting the new flag.
    #[instrument(skip(self))]
    pub async fn switch_agent(&self, agent_id: &str) -> DomainResult<SwitchOutcome> {
        let mut config = self.require_config(agent_id).await?;

        let active = match self.registry.get_agent(agent_id).await {
            Some(agent) if agent.is_active() => {
                agent.set_active(false);
                false
            }
            Some(agent) if agent.set_active(true) => true,
            _ => {
                let tool_configs = self.tools.get_tools_by_ids(&config.tool_ids).await?;
                self.registry
                    .register_agent(agent_id, &config, &tool_configs)
                    .await;
                true
            }
        };

        config.is_active = active;
        self.configs.save_agent_config(&config).await?;

        let message = if active {
            format!("Agent {agent_id} activated")
        } else {
            format!("Agent {agent_id} deactivated")
        };
        info!(agent_id, active, "Agent switched");

        Ok(SwitchOutcome {
            agent_id: agent_id.to_string(),
            active,
            message,
        })
    }

    /// Answer `query`, consulting the agent's knowledge bases first.
    #[instrument(skip(self, query))]
    pub async fn query_agent(
        &self,
        agent_id: &str,
        thread_id: &str,
        query: &str,
    ) -> DomainResult<QueryResult> {
        let Some(agent) = self.registry.get_agent(agent_id).await else {
            self.require_config(agent_id).await?;
            return Err(DomainError::AgentInactive(agent_id.to_string()));
        };

        let context = if !agent.is_active() || agent.knowledge_base_ids().is_empty() {
            None
        } else {
            let results = self
                .knowledge
                .search(query, self.top_k, agent.knowledge_base_ids())
                .await;
            debug!(agent_id, hits = results.len(), "Retrieved knowledge context");
            (!results.is_empty()).then(|| format_context(&results))
        };

        Ok(agent.run_query(thread_id, query, context.as_deref()).await)
    }

    /// Retire every live agent.
    pub async fn shutdown(&self) {
        self.registry.cleanup_all().await;
    }

    async fn require_config(&self, agent_id: &str) -> DomainResult<AgentConfig> {
        self.configs
            .get_agent_config(agent_id)
            .await?
            .ok_or_else(|| DomainError::ConfigNotFound(agent_id.to_string()))
    }
}
