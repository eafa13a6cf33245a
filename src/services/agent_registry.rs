//! Process-scoped registry of live agents.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentConfig, AgentState, AgentSummary, QueryResult, ToolConfig};
use crate::domain::ports::{AgentConfigRepository, ToolRepository};
use crate::services::agent_runtime::{Agent, AgentFactory};

/// Outcome of [`AgentRegistry::warm_start`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmStartReport {
    /// Agents installed in the active state
    pub registered: Vec<String>,
    /// Agents installed but errored during construction
    pub errored: Vec<String>,
    /// Agents skipped, with the reason
    pub failed: Vec<(String, String)>,
}

/// Holds at most one live agent per id.
pub struct AgentRegistry {
    factory: AgentFactory,
    agents: RwLock<HashMap<String, Arc<Agent>>>,
}

impl AgentRegistry {
    pub fn new(factory: AgentFactory) -> Self {
        Self {
            factory,
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Build and install an agent, retiring any agent it replaces.
    #[instrument(skip(self, config, tool_configs))]
    pub async fn register_agent(
        &self,
        agent_id: &str,
        config: &AgentConfig,
        tool_configs: &[ToolConfig],
    ) -> Arc<Agent> {
        let agent = Arc::new(self.factory.build(agent_id, config, tool_configs));

        let replaced = {
            let mut agents = self.agents.write().await;
            agents.insert(agent_id.to_string(), Arc::clone(&agent))
        };

        if let Some(previous) = replaced {
            previous.retire().await;
            info!(agent_id, "Replaced existing agent");
        }
        info!(agent_id, state = %agent.state(), "Agent registered");
        agent
    }

    pub async fn get_agent(&self, agent_id: &str) -> Option<Arc<Agent>> {
        self.agents.read().await.get(agent_id).cloned()
    }

    /// Whether an agent is registered under `agent_id`, in any state.
    pub async fn is_initialized(&self, agent_id: &str) -> bool {
        self.agents.read().await.contains_key(agent_id)
    }

    /// Construction error recorded for an errored agent.
    pub async fn init_error(&self, agent_id: &str) -> Option<String> {
        self.get_agent(agent_id)
            .await
            .and_then(|agent| agent.init_error().map(str::to_string))
    }

    /// Toggle a live agent. False when absent, errored or removed.
    pub async fn set_active(&self, agent_id: &str, active: bool) -> bool {
        match self.get_agent(agent_id).await {
            Some(agent) => agent.set_active(active),
            None => false,
        }
    }

    /// Remove and retire one agent. False when absent.
    pub async fn cleanup_agent(&self, agent_id: &str) -> bool {
        let removed = self.agents.write().await.remove(agent_id);
        match removed {
            Some(agent) => {
                agent.retire().await;
                info!(agent_id, "Agent removed");
                true
            }
            None => false,
        }
    }

    /// Retire and drop every agent.
    pub async fn cleanup_all(&self) {
        let drained: Vec<Arc<Agent>> = {
            let mut agents = self.agents.write().await;
            agents.drain().map(|(_, agent)| agent).collect()
        };
        let count = drained.len();
        for agent in drained {
            agent.retire().await;
        }
        info!(count, "All agents removed");
    }

    /// Summaries of all registered agents, ordered by id.
    pub async fn list_agents(&self) -> Vec<AgentSummary> {
        let agents: Vec<Arc<Agent>> = self.agents.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(agents.len());
        for agent in agents {
            summaries.push(agent.summary().await);
        }
        summaries.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        summaries
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    /// Query a registered agent. Unknown ids answer `AgentInactive`.
    pub async fn run_query(
        &self,
        agent_id: &str,
        thread_id: &str,
        query: &str,
        context: Option<&str>,
    ) -> QueryResult {
        match self.get_agent(agent_id).await {
            Some(agent) => agent.run_query(thread_id, query, context).await,
            None => QueryResult::from_error(
                agent_id,
                thread_id,
                &DomainError::AgentInactive(agent_id.to_string()),
            ),
        }
    }

    /// Register every active configuration. Per-agent failures are logged
    /// and reported, never fatal.
    pub async fn warm_start(
        &self,
        configs: &dyn AgentConfigRepository,
        tools: &dyn ToolRepository,
    ) -> DomainResult<WarmStartReport> {
        let mut report = WarmStartReport::default();

        for config in configs.get_active_agent_configs().await? {
            let tool_configs = match tools.get_tools_by_ids(&config.tool_ids).await {
                Ok(found) => found,
                Err(err) => {
                    warn!(agent_id = %config.id, error = %err, "Skipping agent: tool lookup failed");
                    report.failed.push((config.id.clone(), err.to_string()));
                    continue;
                }
            };

            let agent = self.register_agent(&config.id, &config, &tool_configs).await;
            match agent.state() {
                AgentState::Errored { .. } => report.errored.push(config.id.clone()),
                _ => report.registered.push(config.id.clone()),
            }
        }

        info!(
            registered = report.registered.len(),
            errored = report.errored.len(),
            failed = report.failed.len(),
            "Warm start complete"
        );
        Ok(report)
    }
}
