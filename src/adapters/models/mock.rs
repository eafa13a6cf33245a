//! Scriptable in-process chat model.
//!
//! Backs the `mock` provider and the test suites. With an empty script it
//! echoes the latest user message.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConversationMessage, Role, ToolCall};
use crate::domain::ports::{ChatModel, ChatRequest, ModelFactory, ModelReply, ModelSpec};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockStep {
    Reply(String),
    ToolCalls(Vec<ToolCall>),
    Fail(String),
}

/// Snapshot of a request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub tool_names: Vec<String>,
    pub messages: Vec<ConversationMessage>,
}

impl RecordedRequest {
    /// Content of the last user message.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Chat model returning scripted replies.
#[derive(Debug)]
pub struct MockChatModel {
    model: String,
    script: Mutex<VecDeque<MockStep>>,
    requests: Mutex<Vec<RecordedRequest>>,
    call_count: AtomicUsize,
    delay: Option<Duration>,
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new("mock-model")
    }
}

impl MockChatModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            delay: None,
        }
    }

    #[must_use]
    pub fn with_script(self, steps: impl IntoIterator<Item = MockStep>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(steps);
        self
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_step(&self, step: MockStep) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, request: ChatRequest<'_>) -> DomainResult<ModelReply> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let recorded = RecordedRequest {
            system_prompt: request.system_prompt.to_string(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
            messages: request.messages.to_vec(),
        };
        let echo = format!("echo: {}", recorded.last_user_message().unwrap_or_default());
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(recorded);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match step {
            Some(MockStep::Reply(text)) => Ok(ModelReply::Text(text)),
            Some(MockStep::ToolCalls(calls)) => Ok(ModelReply::ToolCalls {
                content: String::new(),
                calls,
            }),
            Some(MockStep::Fail(message)) => Err(DomainError::ModelInvocationFailed(message)),
            None => Ok(ModelReply::Text(echo)),
        }
    }
}

/// Factory handing out one shared [`MockChatModel`], refusing listed
/// providers.
#[derive(Debug, Default)]
pub struct MockModelFactory {
    model: Arc<MockChatModel>,
    rejected_providers: Vec<String>,
    created: AtomicUsize,
}

impl MockModelFactory {
    pub fn new(model: Arc<MockChatModel>) -> Self {
        Self {
            model,
            rejected_providers: Vec::new(),
            created: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn rejecting(mut self, provider: impl Into<String>) -> Self {
        self.rejected_providers.push(provider.into());
        self
    }

    pub fn model(&self) -> Arc<MockChatModel> {
        Arc::clone(&self.model)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ModelFactory for MockModelFactory {
    fn create(&self, spec: &ModelSpec) -> DomainResult<Arc<dyn ChatModel>> {
        if self.rejected_providers.iter().any(|p| p == &spec.provider) {
            return Err(DomainError::ModelInitFailed(format!(
                "Unsupported model provider: {}",
                spec.provider
            )));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.model) as Arc<dyn ChatModel>)
    }
}
