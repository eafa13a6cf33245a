//! Binds tool configurations to executable tools.

use std::sync::Arc;

use tracing::debug;

use crate::adapters::tools::{ApiTool, FunctionRegistry, FunctionTool};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ToolBinding, ToolConfig, ToolKind};
use crate::domain::ports::ToolInvoker;

/// Resolves each tool's kind to an invoker once, at bind time.
#[derive(Debug, Clone)]
pub struct ToolBinder {
    http: reqwest::Client,
    functions: Arc<FunctionRegistry>,
}

impl Default for ToolBinder {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), Arc::new(FunctionRegistry::with_builtins()))
    }
}

impl ToolBinder {
    pub fn new(http: reqwest::Client, functions: Arc<FunctionRegistry>) -> Self {
        Self { http, functions }
    }

    pub fn bind(&self, config: &ToolConfig) -> DomainResult<ToolBinding> {
        let invoker: Arc<dyn ToolInvoker> = match config.kind {
            ToolKind::Api => {
                let api_config = config
                    .api_config
                    .clone()
                    .ok_or_else(|| missing_section(config, "api_config"))?;
                Arc::new(ApiTool::new(&config.name, api_config, self.http.clone())?)
            }
            ToolKind::Function => {
                let function_config = config
                    .function_config
                    .as_ref()
                    .ok_or_else(|| missing_section(config, "function_config"))?;
                Arc::new(FunctionTool::bind(&config.name, &function_config.code, &self.functions)?)
            }
        };

        debug!(tool = %config.name, kind = config.kind.as_str(), "Bound tool");
        Ok(ToolBinding::new(config, invoker))
    }

    /// Bind every tool, failing on the first one that cannot be bound.
    pub fn bind_all(&self, configs: &[ToolConfig]) -> DomainResult<Vec<ToolBinding>> {
        configs.iter().map(|config| self.bind(config)).collect()
    }
}

fn missing_section(config: &ToolConfig, section: &str) -> DomainError {
    DomainError::ToolBindFailed {
        tool: config.name.clone(),
        reason: format!("{} tool has no {section}", config.kind.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::models::{ApiConfig, ParameterSpec};

    #[tokio::test]
    async fn test_binds_function_tool() {
        let config = ToolConfig::function("t1", "counter", "word_count")
            .with_description("Counts words")
            .with_parameter(
                "text",
                ParameterSpec {
                    param_type: "string".to_string(),
                    default: None,
                    description: Some("Text to count".to_string()),
                },
            );

        let binding = ToolBinder::default().bind(&config).unwrap();
        assert_eq!(binding.name, "counter");
        assert_eq!(binding.parameter_schema["required"], json!(["text"]));
        assert_eq!(
            binding.invoke(json!({"text": "a b c"})).await.unwrap(),
            json!({"words": 3})
        );
    }

    #[test]
    fn test_missing_sections_fail() {
        let mut api = ToolConfig::api(
            "t1",
            "weather",
            ApiConfig {
                endpoint: "http://localhost/weather".to_string(),
                method: "GET".to_string(),
                headers: Default::default(),
                query_params: Default::default(),
                body: Default::default(),
            },
        );
        api.api_config = None;
        let err = ToolBinder::default().bind(&api).unwrap_err();
        assert!(matches!(err, DomainError::ToolBindFailed { ref tool, .. } if tool == "weather"));

        let mut function = ToolConfig::function("t2", "f", "echo");
        function.function_config = None;
        assert!(ToolBinder::default().bind(&function).is_err());
    }

    #[test]
    fn test_bind_all_stops_on_unknown_function() {
        let configs = vec![
            ToolConfig::function("a", "echo", "echo"),
            ToolConfig::function("b", "bogus", "does_not_exist"),
        ];
        assert!(ToolBinder::default().bind_all(&configs).is_err());
        assert_eq!(ToolBinder::default().bind_all(&configs[..1]).unwrap().len(), 1);
    }
}
