//! OpenAI-compatible chat completions client.
//!
//! Serves both OpenAI and Ollama (which exposes the same `/chat/completions`
//! shape).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConversationMessage, Role, ToolBinding, ToolCall};
use crate::domain::ports::{ChatModel, ChatRequest, ModelReply};

/// Chat model speaking the OpenAI chat completions protocol.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: reqwest::Client,
    provider: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(
        client: reqwest::Client,
        provider: impl Into<String>,
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            provider: provider.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            temperature,
        }
    }

    fn build_body(&self, request: &ChatRequest<'_>) -> Value {
        let mut messages = vec![json!({"role": "system", "content": request.system_prompt})];
        messages.extend(request.messages.iter().map(to_wire_message));

        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
        });
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(to_wire_tool).collect());
        }
        body
    }
}

fn to_wire_message(message: &ConversationMessage) -> Value {
    match message.role {
        Role::User => json!({"role": "user", "content": message.content}),
        Role::Assistant if message.tool_calls.is_empty() => {
            json!({"role": "assistant", "content": message.content})
        }
        Role::Assistant => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {"name": call.name, "arguments": call.arguments.to_string()},
                    })
                })
                .collect();
            let content = if message.content.is_empty() {
                Value::Null
            } else {
                Value::String(message.content.clone())
            };
            json!({"role": "assistant", "content": content, "tool_calls": calls})
        }
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content,
        }),
    }
}

fn to_wire_tool(tool: &ToolBinding) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameter_schema,
        },
    })
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, request: ChatRequest<'_>) -> DomainResult<ModelReply> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&self.build_body(&request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DomainError::ModelInvocationFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::ModelInvocationFailed(format!(
                "{} returned {status}: {body}",
                self.provider
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| DomainError::ModelInvocationFailed(format!("invalid response: {e}")))?;

        let message = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::ModelInvocationFailed("response has no choices".to_string()))?
            .message;

        let content = message.content.unwrap_or_default();
        if message.tool_calls.is_empty() {
            return Ok(ModelReply::Text(content));
        }

        let calls = message
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments)),
            })
            .collect();
        Ok(ModelReply::ToolCalls { content, calls })
    }
}
