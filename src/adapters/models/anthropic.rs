//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConversationMessage, Role, ToolCall};
use crate::domain::ports::{ChatModel, ChatRequest, ModelReply};

const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Chat model backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicChatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl AnthropicChatModel {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        }
    }

    fn build_body(&self, request: &ChatRequest<'_>) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "temperature": self.temperature,
            "system": request.system_prompt,
            "messages": to_wire_messages(request.messages),
        });
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameter_schema,
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }
}

/// Tool results travel as `tool_result` blocks inside user messages;
/// consecutive results share one message.
fn to_wire_messages(messages: &[ConversationMessage]) -> Vec<Value> {
    let mut wire: Vec<Value> = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            Role::User => wire.push(json!({
                "role": "user",
                "content": [{"type": "text", "text": message.content}],
            })),
            Role::Assistant => {
                let mut blocks = Vec::new();
                if !message.content.is_empty() {
                    blocks.push(json!({"type": "text", "text": message.content}));
                }
                for call in &message.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                wire.push(json!({"role": "assistant", "content": blocks}));
            }
            Role::Tool => {
                let block = json!({
                    "type": "tool_result",
                    "tool_use_id": message.tool_call_id,
                    "content": message.content,
                });
                let appended = wire.last_mut().is_some_and(|last| {
                    let holds_results = last["role"] == "user"
                        && last["content"]
                            .as_array()
                            .is_some_and(|c| c.iter().all(|b| b["type"] == "tool_result"));
                    if holds_results {
                        if let Some(content) = last["content"].as_array_mut() {
                            content.push(block.clone());
                        }
                    }
                    holds_results
                });
                if !appended {
                    wire.push(json!({"role": "user", "content": [block]}));
                }
            }
        }
    }
    wire
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[async_trait]
impl ChatModel for AnthropicChatModel {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, request: ChatRequest<'_>) -> DomainResult<ModelReply> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.build_body(&request))
            .send()
            .await
            .map_err(|e| DomainError::ModelInvocationFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::ModelInvocationFailed(format!(
                "anthropic returned {status}: {body}"
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| DomainError::ModelInvocationFailed(format!("invalid response: {e}")))?;

        let mut text = String::new();
        let mut calls = Vec::new();
        for block in parsed.content {
            match block {
                ContentBlock::Text { text: t } => text.push_str(&t),
                ContentBlock::ToolUse { id, name, input } => calls.push(ToolCall {
                    id,
                    name,
                    arguments: input,
                }),
                ContentBlock::Other => {}
            }
        }

        if calls.is_empty() {
            Ok(ModelReply::Text(text))
        } else {
            Ok(ModelReply::ToolCalls {
                content: text,
                calls,
            })
        }
    }
}
