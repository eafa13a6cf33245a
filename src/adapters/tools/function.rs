//! Native function tools.
//!
//! A `function` tool names a handler registered here; nothing is evaluated
//! from configuration text.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::ToolInvoker;

/// Synchronous handler taking the call arguments.
pub type FunctionHandler = Arc<dyn Fn(&Value) -> DomainResult<Value> + Send + Sync>;

/// Named native handlers available to `function` tools.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    handlers: HashMap<String, FunctionHandler>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("handlers", &names).finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `echo`, `current_time` and `word_count`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("echo", |args| Ok(args.clone()));
        registry.register("current_time", |_| Ok(json!({"utc": chrono::Utc::now().to_rfc3339()})));
        registry.register("word_count", |args| {
            let text = args
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| DomainError::ToolExecutionFailed {
                    tool: "word_count".to_string(),
                    reason: "missing string argument 'text'".to_string(),
                })?;
            Ok(json!({"words": text.split_whitespace().count()}))
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Value) -> DomainResult<Value> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<FunctionHandler> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

/// A bound native function.
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    handler: FunctionHandler,
}

impl FunctionTool {
    /// Resolve `function_name` in `registry`.
    pub fn bind(tool_name: &str, function_name: &str, registry: &FunctionRegistry) -> DomainResult<Self> {
        let handler = registry.get(function_name).ok_or_else(|| DomainError::ToolBindFailed {
            tool: tool_name.to_string(),
            reason: format!("no native function named '{function_name}'"),
        })?;
        Ok(Self {
            name: tool_name.to_string(),
            handler,
        })
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolInvoker for FunctionTool {
    async fn invoke(&self, arguments: Value) -> DomainResult<Value> {
        (self.handler)(&arguments)
    }
}
