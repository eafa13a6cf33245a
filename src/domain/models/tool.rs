//! Tool configuration and bound tools.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::errors::DomainResult;
use crate::domain::ports::ToolInvoker;

/// Capability kind of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Api,
    Function,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Function => "function",
        }
    }
}

/// HTTP call description for `api` tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default)]
    pub query_params: Map<String, Value>,

    #[serde(default)]
    pub body: Map<String, Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Native function reference for `function` tools. `code` names a handler
/// registered in the function registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub code: String,
}

/// Declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_param_type() -> String {
    "string".to_string()
}

/// Persisted tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    pub kind: ToolKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_config: Option<ApiConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_config: Option<FunctionConfig>,

    #[serde(default)]
    pub parameters_schema: BTreeMap<String, ParameterSpec>,
}

impl ToolConfig {
    pub fn api(id: impl Into<String>, name: impl Into<String>, api_config: ApiConfig) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind: ToolKind::Api,
            api_config: Some(api_config),
            function_config: None,
            parameters_schema: BTreeMap::new(),
        }
    }

    pub fn function(id: impl Into<String>, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            kind: ToolKind::Function,
            api_config: None,
            function_config: Some(FunctionConfig { code: code.into() }),
            parameters_schema: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters_schema.insert(name.into(), spec);
        self
    }

    /// JSON schema object for the declared parameters. Parameters without a
    /// default are required.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, spec) in &self.parameters_schema {
            let mut property = Map::new();
            property.insert("type".to_string(), Value::String(spec.param_type.clone()));
            if let Some(description) = &spec.description {
                property.insert("description".to_string(), Value::String(description.clone()));
            }
            match &spec.default {
                Some(default) => {
                    property.insert("default".to_string(), default.clone());
                }
                None => required.push(Value::String(name.clone())),
            }
            properties.insert(name.clone(), Value::Object(property));
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A tool resolved against its implementation and ready to be exposed to a
/// model. Immutable once constructed.
#[derive(Clone)]
pub struct ToolBinding {
    pub id: String,
    pub name: String,
    pub description: String,
    pub parameter_schema: Value,
    pub kind: ToolKind,
    invoker: Arc<dyn ToolInvoker>,
}

impl ToolBinding {
    pub fn new(config: &ToolConfig, invoker: Arc<dyn ToolInvoker>) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            parameter_schema: config.json_schema(),
            kind: config.kind,
            invoker,
        }
    }

    pub async fn invoke(&self, arguments: Value) -> DomainResult<Value> {
        self.invoker.invoke(arguments).await
    }
}

impl fmt::Debug for ToolBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBinding")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
