//! Live agent instances.
//!
//! An [`Agent`] owns its model client, bound tools, composed system prompt
//! and conversation memory. Construction never fails: an agent whose model or
//! tools could not be set up is kept in the errored state and answers every
//! query with `ModelInitFailed`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AgentConfig, AgentState, AgentSummary, ConversationMessage, ConversationThread, QueryResult,
    RuntimeConfig, ToolBinding, ToolCall, ToolConfig,
};
use crate::domain::ports::{ChatModel, ChatRequest, ModelFactory, ModelReply, ModelSpec};
use crate::services::conversation_memory::{ConversationMemory, RetentionPolicy};
use crate::services::prompt::{augment_query, build_system_prompt};
use crate::services::timeout::bounded;
use crate::services::tool_binder::ToolBinder;

const LIFECYCLE_ACTIVE: u8 = 0;
const LIFECYCLE_INACTIVE: u8 = 1;
const LIFECYCLE_REMOVED: u8 = 2;

/// Runtime limits applied to every agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentRuntimeOptions {
    /// Bound on one turn, tool rounds included
    pub model_timeout: Duration,
    pub max_tool_rounds: usize,
    pub retention: RetentionPolicy,
}

impl Default for AgentRuntimeOptions {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

impl From<&RuntimeConfig> for AgentRuntimeOptions {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            model_timeout: Duration::from_secs(config.model_timeout_secs),
            max_tool_rounds: config.max_tool_rounds,
            retention: RetentionPolicy::from(&config.memory),
        }
    }
}

/// Builds agents from their configuration.
#[derive(Clone)]
pub struct AgentFactory {
    model_factory: Arc<dyn ModelFactory>,
    tool_binder: ToolBinder,
    options: AgentRuntimeOptions,
}

impl AgentFactory {
    pub fn new(
        model_factory: Arc<dyn ModelFactory>,
        tool_binder: ToolBinder,
        options: AgentRuntimeOptions,
    ) -> Self {
        Self {
            model_factory,
            tool_binder,
            options,
        }
    }

    pub const fn options(&self) -> &AgentRuntimeOptions {
        &self.options
    }

    /// Build an agent. Setup failures yield an errored agent.
    pub fn build(&self, agent_id: &str, config: &AgentConfig, tool_configs: &[ToolConfig]) -> Agent {
        let spec = ModelSpec {
            provider: config.provider.clone(),
            model: config.model.clone(),
            credentials_ref: config.credentials_ref.clone(),
            temperature: config.temperature(),
        };

        let prepared = self.model_factory.create(&spec).and_then(|model| {
            let tools = self.tool_binder.bind_all(tool_configs)?;
            Ok((model, tools))
        });

        let (model, tools, init_error) = match prepared {
            Ok((model, tools)) => {
                info!(
                    agent_id,
                    provider = %spec.provider,
                    model = %spec.model,
                    tools = tools.len(),
                    "Agent initialized"
                );
                (Some(model), tools, None)
            }
            Err(err) => {
                error!(agent_id, error = %err, "Agent initialization failed");
                (None, Vec::new(), Some(err.to_string()))
            }
        };

        let system_prompt = build_system_prompt(
            config.role(),
            !config.knowledge_base_ids.is_empty(),
            !tools.is_empty(),
        );

        Agent {
            agent_id: agent_id.to_string(),
            config: config.clone(),
            system_prompt,
            tools,
            model,
            init_error,
            lifecycle: AtomicU8::new(LIFECYCLE_ACTIVE),
            memory: ConversationMemory::new(self.options.retention),
            options: self.options,
        }
    }
}

/// A configured, live agent.
pub struct Agent {
    agent_id: String,
    config: AgentConfig,
    system_prompt: String,
    tools: Vec<ToolBinding>,
    model: Option<Arc<dyn ChatModel>>,
    init_error: Option<String>,
    lifecycle: AtomicU8,
    memory: ConversationMemory,
    options: AgentRuntimeOptions,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("agent_id", &self.agent_id)
            .field("state", &self.state())
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &[ToolBinding] {
        &self.tools
    }

    pub fn knowledge_base_ids(&self) -> &[String] {
        &self.config.knowledge_base_ids
    }

    pub fn init_error(&self) -> Option<&str> {
        self.init_error.as_deref()
    }

    pub fn state(&self) -> AgentState {
        match self.lifecycle.load(Ordering::SeqCst) {
            LIFECYCLE_REMOVED => AgentState::Removed,
            _ if self.init_error.is_some() => AgentState::Errored {
                message: self.init_error.clone().unwrap_or_default(),
            },
            LIFECYCLE_INACTIVE => AgentState::Inactive,
            _ => AgentState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Toggle between active and inactive, keeping memory. Returns false for
    /// errored or removed agents.
    pub fn set_active(&self, active: bool) -> bool {
        if self.init_error.is_some() {
            return false;
        }
        let target = if active {
            LIFECYCLE_ACTIVE
        } else {
            LIFECYCLE_INACTIVE
        };
        let toggled = self
            .lifecycle
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current != LIFECYCLE_REMOVED).then_some(target)
            })
            .is_ok();
        if toggled {
            debug!(agent_id = %self.agent_id, active, "Agent toggled");
        }
        toggled
    }

    /// Move to the terminal removed state and drop all conversations.
    pub async fn retire(&self) {
        self.lifecycle.store(LIFECYCLE_REMOVED, Ordering::SeqCst);
        self.memory.clear().await;
        debug!(agent_id = %self.agent_id, "Agent retired");
    }

    pub async fn thread_history(&self, thread_id: &str) -> Vec<ConversationMessage> {
        self.memory.history(thread_id).await
    }

    pub async fn summary(&self) -> AgentSummary {
        AgentSummary {
            agent_id: self.agent_id.clone(),
            provider: self.config.provider.clone(),
            model: self.config.model.clone(),
            state: self.state(),
            tool_count: self.tools.len(),
            knowledge_base_ids: self.config.knowledge_base_ids.clone(),
            thread_count: self.memory.thread_count().await,
        }
    }

    /// Answer `query` within `thread_id`. Failures are reported in the
    /// result, never raised.
    #[instrument(skip(self, query, context), fields(agent_id = %self.agent_id))]
    pub async fn run_query(&self, thread_id: &str, query: &str, context: Option<&str>) -> QueryResult {
        match self.answer(thread_id, query, context).await {
            Ok((response, rag_used)) => {
                QueryResult::success(&self.agent_id, thread_id, response, rag_used)
            }
            Err(err) => {
                warn!(error = %err, kind = %err.kind(), "Query failed");
                QueryResult::from_error(&self.agent_id, thread_id, &err)
            }
        }
    }

    fn ready_model(&self) -> DomainResult<&Arc<dyn ChatModel>> {
        match self.lifecycle.load(Ordering::SeqCst) {
            LIFECYCLE_REMOVED | LIFECYCLE_INACTIVE => {
                return Err(DomainError::AgentInactive(self.agent_id.clone()));
            }
            _ => {}
        }
        match (&self.model, &self.init_error) {
            (Some(model), None) => Ok(model),
            (_, Some(cause)) => Err(DomainError::ModelInitFailed(cause.clone())),
            (None, None) => Err(DomainError::ModelInitFailed(format!(
                "agent {} has no model",
                self.agent_id
            ))),
        }
    }

    async fn answer(
        &self,
        thread_id: &str,
        query: &str,
        context: Option<&str>,
    ) -> DomainResult<(String, bool)> {
        let model = self.ready_model()?;
        let (effective_query, rag_used) = augment_query(query, context);

        let handle = self.memory.checkout(thread_id).await;
        let outcome = self.take_turn(&handle, effective_query, model.as_ref()).await;
        drop(handle);
        self.memory.touch(thread_id).await;

        let response = outcome?;
        debug!(thread_id, rag_used, "Query answered");
        Ok((response, rag_used))
    }

    /// One serialized turn on a thread. History is only extended on success.
    async fn take_turn(
        &self,
        handle: &Mutex<ConversationThread>,
        effective_query: String,
        model: &dyn ChatModel,
    ) -> DomainResult<String> {
        let mut thread = handle.lock().await;

        let mut messages = thread.messages.clone();
        messages.push(ConversationMessage::user(effective_query.clone()));

        let response = bounded(
            "model invocation",
            self.options.model_timeout,
            self.converse(model, &mut messages),
        )
        .await?;

        let max_messages = self.options.retention.max_messages_per_thread;
        thread.push(ConversationMessage::user(effective_query), max_messages);
        thread.push(ConversationMessage::assistant(response.clone()), max_messages);
        Ok(response)
    }

    /// Invoke the model until it answers with text, running requested tools
    /// in between.
    async fn converse(
        &self,
        model: &dyn ChatModel,
        messages: &mut Vec<ConversationMessage>,
    ) -> DomainResult<String> {
        for round in 0..=self.options.max_tool_rounds {
            let request = ChatRequest {
                system_prompt: &self.system_prompt,
                tools: &self.tools,
                messages: messages.as_slice(),
            };
            match model.invoke(request).await? {
                ModelReply::Text(text) => return Ok(text),
                ModelReply::ToolCalls { content, calls } => {
                    if round == self.options.max_tool_rounds {
                        break;
                    }
                    debug!(round, calls = calls.len(), "Model requested tools");
                    messages.push(ConversationMessage::assistant_tool_calls(content, calls.clone()));
                    for call in calls {
                        let output = self.execute_tool(&call).await;
                        messages.push(ConversationMessage::tool_result(call.id, output));
                    }
                }
            }
        }

        Err(DomainError::ModelInvocationFailed(format!(
            "model still requesting tools after {} rounds",
            self.options.max_tool_rounds
        )))
    }

    async fn execute_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|tool| tool.name == call.name) else {
            warn!(tool = %call.name, "Model requested an unbound tool");
            return format!("Error: unknown tool '{}'", call.name);
        };

        match tool.invoke(call.arguments.clone()).await {
            Ok(Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(err) => {
                warn!(tool = %call.name, error = %err, "Tool call failed");
                format!("Error: {err}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapters::models::{MockChatModel, MockModelFactory, MockStep};
    use crate::domain::errors::ErrorKind;
    use crate::domain::models::{MemoryConfig, Role};

    fn factory(model: Arc<MockChatModel>, options: AgentRuntimeOptions) -> AgentFactory {
        AgentFactory::new(
            Arc::new(MockModelFactory::new(model).rejecting("bogus")),
            ToolBinder::default(),
            options,
        )
    }

    fn config() -> AgentConfig {
        AgentConfig::new("helper", "mock", "mock-model").with_system_prompt("Help with billing.")
    }

    #[tokio::test]
    async fn test_query_appends_turn_to_thread() {
        let model = Arc::new(MockChatModel::default());
        let agent = factory(Arc::clone(&model), AgentRuntimeOptions::default()).build("helper", &config(), &[]);

        let result = agent.run_query("t1", "hello", None).await;
        assert_eq!(result.response(), Some("echo: hello"));
        assert!(!result.rag_used());

        let second = agent.run_query("t1", "again", None).await;
        assert!(second.is_success());

        let history = agent.thread_history("t1").await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].content, "echo: hello");

        let requests = model.requests();
        assert_eq!(requests[1].messages.len(), 3);
        assert!(requests[0].system_prompt.contains("Your primary role: Help with billing."));
    }

    #[tokio::test]
    async fn test_context_is_truncated_and_marks_rag() {
        let model = Arc::new(MockChatModel::default());
        let agent = factory(Arc::clone(&model), AgentRuntimeOptions::default()).build("helper", &config(), &[]);

        let context = "x".repeat(5000);
        let result = agent.run_query("t", "what?", Some(&context)).await;
        assert!(result.rag_used());

        let sent = model.requests()[0].last_user_message().unwrap().to_string();
        assert!(sent.starts_with("I need information about: what?"));
        assert!(sent.contains(&"x".repeat(1000)));
        assert!(!sent.contains(&"x".repeat(1001)));
    }

    #[tokio::test]
    async fn test_errored_agent_never_calls_model() {
        let model = Arc::new(MockChatModel::default());
        let agent = factory(Arc::clone(&model), AgentRuntimeOptions::default()).build(
            "broken",
            &AgentConfig::new("broken", "bogus", "m"),
            &[],
        );

        assert!(matches!(agent.state(), AgentState::Errored { .. }));
        assert!(!agent.set_active(true));

        let result = agent.run_query("t", "hi", None).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ModelInitFailed));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unbindable_tool_errors_agent() {
        let model = Arc::new(MockChatModel::default());
        let tools = vec![ToolConfig::function("t", "nope", "not_registered")];
        let agent = factory(model, AgentRuntimeOptions::default()).build("helper", &config(), &tools);

        match agent.state() {
            AgentState::Errored { message } => assert!(message.contains("nope")),
            other => panic!("expected errored, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inactive_agent_keeps_memory() {
        let model = Arc::new(MockChatModel::default());
        let agent = factory(Arc::clone(&model), AgentRuntimeOptions::default()).build("helper", &config(), &[]);
        agent.run_query("t", "one", None).await;

        assert!(agent.set_active(false));
        let result = agent.run_query("t", "two", None).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::AgentInactive));
        assert_eq!(model.call_count(), 1);

        assert!(agent.set_active(true));
        assert_eq!(agent.thread_history("t").await.len(), 2);
    }

    #[tokio::test]
    async fn test_retired_agent_is_terminal() {
        let agent = factory(Arc::new(MockChatModel::default()), AgentRuntimeOptions::default())
            .build("helper", &config(), &[]);
        agent.run_query("t", "one", None).await;

        agent.retire().await;
        assert_eq!(agent.state(), AgentState::Removed);
        assert!(!agent.set_active(true));
        assert!(agent.thread_history("t").await.is_empty());
        assert_eq!(
            agent.run_query("t", "two", None).await.error_kind(),
            Some(ErrorKind::AgentInactive)
        );
    }

    #[tokio::test]
    async fn test_tool_calls_are_executed_and_fed_back() {
        let model = Arc::new(MockChatModel::default().with_script([
            MockStep::ToolCalls(vec![
                ToolCall {
                    id: "call_1".to_string(),
                    name: "counter".to_string(),
                    arguments: json!({"text": "three little words"}),
                },
                ToolCall {
                    id: "call_2".to_string(),
                    name: "counter".to_string(),
                    arguments: json!({}),
                },
            ]),
            MockStep::Reply("There are 3 words.".to_string()),
        ]));
        let tools = vec![ToolConfig::function("t", "counter", "word_count")];
        let agent = factory(Arc::clone(&model), AgentRuntimeOptions::default()).build("helper", &config(), &tools);

        let result = agent.run_query("t", "count please", None).await;
        assert_eq!(result.response(), Some("There are 3 words."));
        assert!(model.requests()[0].system_prompt.contains("IMPORTANT TOOLS INSTRUCTIONS:"));
        assert_eq!(model.requests()[0].tool_names, vec!["counter"]);

        let follow_up = &model.requests()[1].messages;
        let results: Vec<_> = follow_up.iter().filter(|m| m.role == Role::Tool).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, r#"{"words":3}"#);
        assert!(results[1].content.starts_with("Error:"));

        // Only the user turn and the final answer are remembered.
        assert_eq!(agent.thread_history("t").await.len(), 2);
    }

    #[tokio::test]
    async fn test_tool_rounds_are_bounded() {
        let call = || {
            MockStep::ToolCalls(vec![ToolCall {
                id: "c".to_string(),
                name: "echo".to_string(),
                arguments: json!({}),
            }])
        };
        let model = Arc::new(MockChatModel::default().with_script([call(), call(), call()]));
        let options = AgentRuntimeOptions {
            max_tool_rounds: 2,
            ..AgentRuntimeOptions::default()
        };
        let tools = vec![ToolConfig::function("e", "echo", "echo")];
        let agent = factory(Arc::clone(&model), options).build("helper", &config(), &tools);

        let result = agent.run_query("t", "loop", None).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ModelInvocationFailed));
        assert_eq!(model.call_count(), 3);
        assert!(agent.thread_history("t").await.is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_leaves_history_untouched() {
        let model = Arc::new(
            MockChatModel::default().with_script([MockStep::Fail("upstream returned 502".to_string())]),
        );
        let agent = factory(Arc::clone(&model), AgentRuntimeOptions::default()).build("helper", &config(), &[]);

        let result = agent.run_query("t", "hi", None).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::ModelInvocationFailed));
        match &result {
            QueryResult::Error { message, .. } => assert!(message.contains("upstream returned 502")),
            QueryResult::Success { .. } => panic!("expected an error result"),
        }
        assert!(agent.thread_history("t").await.is_empty());

        assert!(agent.run_query("t", "hi", None).await.is_success());
        assert_eq!(agent.thread_history("t").await.len(), 2);
    }

    #[tokio::test]
    async fn test_turns_on_one_thread_are_serialized() {
        let model = Arc::new(MockChatModel::default().with_delay(Duration::from_millis(100)));
        let agent = Arc::new(factory(Arc::clone(&model), AgentRuntimeOptions::default()).build("helper", &config(), &[]));

        let first = tokio::spawn({
            let agent = Arc::clone(&agent);
            async move { agent.run_query("t", "first", None).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = tokio::spawn({
            let agent = Arc::clone(&agent);
            async move { agent.run_query("t", "second", None).await }
        });

        assert!(first.await.unwrap().is_success());
        assert!(second.await.unwrap().is_success());

        let requests = model.requests();
        assert_eq!(requests[1].last_user_message(), Some("second"));
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(agent.thread_history("t").await.len(), 4);
    }

    #[tokio::test]
    async fn test_running_turn_survives_thread_eviction() {
        let model = Arc::new(MockChatModel::default().with_delay(Duration::from_millis(200)));
        let options = AgentRuntimeOptions {
            retention: RetentionPolicy::from(&MemoryConfig {
                max_threads: 1,
                max_messages_per_thread: 10,
                idle_ttl_secs: 0,
            }),
            ..AgentRuntimeOptions::default()
        };
        let agent = Arc::new(factory(Arc::clone(&model), options).build("helper", &config(), &[]));

        let spawn_query = |thread: &'static str, query: &'static str| {
            let agent = Arc::clone(&agent);
            tokio::spawn(async move { agent.run_query(thread, query, None).await })
        };

        let a1 = spawn_query("a", "a1");
        tokio::time::sleep(Duration::from_millis(20)).await;
        let b1 = spawn_query("b", "b1");
        tokio::time::sleep(Duration::from_millis(20)).await;
        let a2 = spawn_query("a", "a2");

        for handle in [a1, b1, a2] {
            assert!(handle.await.unwrap().is_success());
        }

        let requests = model.requests();
        let second_on_a = requests
            .iter()
            .find(|r| r.last_user_message() == Some("a2"))
            .unwrap();
        assert_eq!(second_on_a.messages.len(), 3);
        assert_eq!(second_on_a.messages[0].content, "a1");
        assert_eq!(agent.thread_history("a").await.len(), 4);
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let model = Arc::new(MockChatModel::default().with_delay(Duration::from_millis(500)));
        let options = AgentRuntimeOptions {
            model_timeout: Duration::from_millis(20),
            ..AgentRuntimeOptions::default()
        };
        let agent = factory(model, options).build("helper", &config(), &[]);

        let result = agent.run_query("t", "hi", None).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_history_is_trimmed() {
        let options = AgentRuntimeOptions {
            retention: RetentionPolicy::from(&MemoryConfig {
                max_threads: 10,
                max_messages_per_thread: 4,
                idle_ttl_secs: 0,
            }),
            ..AgentRuntimeOptions::default()
        };
        let agent = factory(Arc::new(MockChatModel::default()), options).build("helper", &config(), &[]);
        for i in 0..5 {
            agent.run_query("t", &format!("q{i}"), None).await;
        }

        let history = agent.thread_history("t").await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "q3");
    }
}
