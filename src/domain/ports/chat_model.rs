//! Language model port.
//!
//! A `ChatModel` is an opaque capability: given a system prompt, the bound
//! tools and the conversation so far it answers with text or with tool calls.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ConversationMessage, ToolBinding, ToolCall};

/// One model invocation.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system_prompt: &'a str,
    pub tools: &'a [ToolBinding],
    /// Thread history followed by the current query and any tool exchanges
    /// of this turn.
    pub messages: &'a [ConversationMessage],
}

/// What the model answered.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCalls {
        /// Text emitted alongside the calls, often empty
        content: String,
        calls: Vec<ToolCall>,
    },
}

/// A configured model client.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name (e.g., "openai").
    fn provider(&self) -> &str;

    /// Model name.
    fn model(&self) -> &str;

    /// Run one completion.
    async fn invoke(&self, request: ChatRequest<'_>) -> DomainResult<ModelReply>;
}

/// Everything needed to instantiate a model client.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub provider: String,
    pub model: String,
    /// Environment variable holding the API key
    pub credentials_ref: Option<String>,
    pub temperature: f32,
}

/// Resolves a provider string to a model client once, at construction.
pub trait ModelFactory: Send + Sync {
    /// Build a client. Unknown providers and missing credentials are errors.
    fn create(&self, spec: &ModelSpec) -> DomainResult<Arc<dyn ChatModel>>;
}
