//! Agent configuration, lifecycle state and query results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::{DomainError, ErrorKind};

/// Persisted configuration of an agent, as supplied by the configuration
/// repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique agent identifier
    pub id: String,

    /// Human readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Model provider (openai, anthropic, ollama, mock)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name passed to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the provider credentials
    #[serde(default)]
    pub credentials_ref: Option<String>,

    /// Role description composed into the system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Knowledge bases consulted before querying the model
    #[serde(default)]
    pub knowledge_base_ids: Vec<String>,

    /// Tools bound to the model
    #[serde(default)]
    pub tool_ids: Vec<String>,

    /// Provider settings (temperature, ...)
    #[serde(default)]
    pub settings: Map<String, Value>,

    /// Whether the agent should be live
    #[serde(default)]
    pub is_active: bool,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

const DEFAULT_TEMPERATURE: f32 = 0.7;

impl AgentConfig {
    pub fn new(id: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            provider: provider.into(),
            model: model.into(),
            credentials_ref: None,
            system_prompt: None,
            knowledge_base_ids: Vec::new(),
            tool_ids: Vec::new(),
            settings: Map::new(),
            is_active: false,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub fn with_knowledge_bases<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.knowledge_base_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_tools<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_credentials_ref(mut self, env_var: impl Into<String>) -> Self {
        self.credentials_ref = Some(env_var.into());
        self
    }

    #[must_use]
    pub const fn active(mut self) -> Self {
        self.is_active = true;
        self
    }

    /// Sampling temperature from `settings.temperature`, defaulting to 0.7.
    #[allow(clippy::cast_possible_truncation)]
    pub fn temperature(&self) -> f32 {
        self.settings
            .get("temperature")
            .and_then(Value::as_f64)
            .map_or(DEFAULT_TEMPERATURE, |t| t as f32)
    }

    /// The configured role, or a generic one when none is set.
    pub fn role(&self) -> &str {
        self.system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or("Assist the user with their requests.")
    }
}

/// Lifecycle state of a live agent instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AgentState {
    Active,
    Inactive,
    Errored { message: String },
    Removed,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Errored { .. } => "errored",
            Self::Removed => "removed",
        }
    }

    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a query against an agent. Failures are carried as data, never
/// raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResult {
    Success {
        response: String,
        agent_id: String,
        thread_id: String,
        rag_used: bool,
    },
    Error {
        kind: ErrorKind,
        message: String,
        agent_id: String,
        thread_id: String,
    },
}

impl QueryResult {
    pub fn success(
        agent_id: impl Into<String>,
        thread_id: impl Into<String>,
        response: impl Into<String>,
        rag_used: bool,
    ) -> Self {
        Self::Success {
            response: response.into(),
            agent_id: agent_id.into(),
            thread_id: thread_id.into(),
            rag_used,
        }
    }

    pub fn from_error(
        agent_id: impl Into<String>,
        thread_id: impl Into<String>,
        error: &DomainError,
    ) -> Self {
        Self::Error {
            kind: error.kind(),
            message: error.to_string(),
            agent_id: agent_id.into(),
            thread_id: thread_id.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn response(&self) -> Option<&str> {
        match self {
            Self::Success { response, .. } => Some(response),
            Self::Error { .. } => None,
        }
    }

    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Error { kind, .. } => Some(*kind),
        }
    }

    pub const fn rag_used(&self) -> bool {
        matches!(self, Self::Success { rag_used: true, .. })
    }

    pub fn agent_id(&self) -> &str {
        match self {
            Self::Success { agent_id, .. } | Self::Error { agent_id, .. } => agent_id,
        }
    }

    pub fn thread_id(&self) -> &str {
        match self {
            Self::Success { thread_id, .. } | Self::Error { thread_id, .. } => thread_id,
        }
    }
}

/// Diagnostic view of a registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub provider: String,
    pub model: String,
    pub state: AgentState,
    pub tool_count: usize,
    pub knowledge_base_ids: Vec<String>,
    pub thread_count: usize,
}
