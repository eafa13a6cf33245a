//! Agent CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use uuid::Uuid;

use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::errors::DomainError;
use crate::domain::models::{AgentState, QueryResult};
use crate::domain::ports::AgentConfigRepository;
use crate::infrastructure::AppContext;
use crate::services::SwitchOutcome;

#[derive(Args, Debug)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// List catalog agents and their runtime state
    List,
    /// Ask an active agent a question
    Query {
        /// Agent identifier
        agent_id: String,
        /// Question text
        query: String,
        /// Conversation thread (a new one when omitted)
        #[arg(short, long)]
        thread: Option<String>,
    },
    /// Turn an agent on or off
    Switch {
        /// Agent identifier
        agent_id: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct AgentRow {
    pub id: String,
    pub provider: String,
    pub model: String,
    pub state: String,
    pub tools: usize,
    pub knowledge_bases: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct AgentListOutput {
    pub agents: Vec<AgentRow>,
    pub total: usize,
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "provider", "model", "state", "tools", "knowledge bases"]);
        for agent in &self.agents {
            let state = match &agent.error {
                Some(error) => format!("{} ({})", agent.state, truncate(error, 40)),
                None => agent.state.clone(),
            };
            table.add_row(vec![
                agent.id.clone(),
                agent.provider.clone(),
                agent.model.clone(),
                state,
                agent.tools.to_string(),
                agent.knowledge_bases.join(", "),
            ]);
        }
        render_list("agent", &table, self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl CommandOutput for QueryResult {
    fn to_human(&self) -> String {
        match self {
            Self::Success {
                response,
                thread_id,
                rag_used,
                ..
            } => {
                let source = if *rag_used { ", knowledge base used" } else { "" };
                format!("{response}\n\n[thread {thread_id}{source}]")
            }
            Self::Error { kind, message, .. } => format!("Query failed ({kind}): {message}"),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl CommandOutput for SwitchOutcome {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: AgentArgs, context: &AppContext, json_mode: bool) -> Result<()> {
    let service = &context.agents;
    service
        .warm_start()
        .await
        .context("Failed to load active agents")?;

    let outcome = match args.command {
        AgentCommands::List => {
            let configs = context.catalog.list_agent_configs().await?;
            let mut agents = Vec::with_capacity(configs.len());
            for config in configs {
                let live = service.registry().get_agent(&config.id).await;
                let (state, tools, error) = match &live {
                    Some(agent) => {
                        let state = agent.state();
                        let error = match &state {
                            AgentState::Errored { message } => Some(message.clone()),
                            _ => None,
                        };
                        (state.as_str().to_string(), agent.tools().len(), error)
                    }
                    None => (AgentState::Inactive.as_str().to_string(), config.tool_ids.len(), None),
                };
                agents.push(AgentRow {
                    id: config.id,
                    provider: config.provider,
                    model: config.model,
                    state,
                    tools,
                    knowledge_bases: config.knowledge_base_ids,
                    error,
                });
            }
            output(
                &AgentListOutput {
                    total: agents.len(),
                    agents,
                },
                json_mode,
            );
            Ok(())
        }

        AgentCommands::Query {
            agent_id,
            query,
            thread,
        } => {
            let thread_id = thread.unwrap_or_else(|| Uuid::new_v4().to_string());
            match service.query_agent(&agent_id, &thread_id, &query).await {
                Ok(result) => {
                    output(&result, json_mode);
                    Ok(())
                }
                Err(DomainError::AgentInactive(id)) => Err(anyhow::anyhow!(
                    "Agent {id} is not active. Run 'genagent agent switch {id}' first."
                )),
                Err(err) => Err(err.into()),
            }
        }

        AgentCommands::Switch { agent_id } => {
            let outcome = service.switch_agent(&agent_id).await?;
            output(&outcome, json_mode);
            Ok(())
        }
    };

    service.shutdown().await;
    outcome
}
