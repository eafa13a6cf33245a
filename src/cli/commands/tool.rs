//! Tool catalog CLI commands.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::Map;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{ApiConfig, ParameterSpec, ToolConfig};
use crate::domain::ports::ToolRepository;
use crate::infrastructure::AppContext;
use crate::services::ToolBinder;

#[derive(Args, Debug)]
pub struct ToolArgs {
    #[command(subcommand)]
    pub command: ToolCommands,
}

#[derive(Subcommand, Debug)]
pub enum ToolCommands {
    /// Add or replace a tool in the catalog
    Add {
        /// Tool identifier referenced by agents
        tool_id: String,
        /// Name the model calls the tool by
        #[arg(short, long)]
        name: String,
        /// What the tool does
        #[arg(short, long, default_value = "")]
        description: String,
        /// Built-in function handler (echo, current_time, word_count)
        #[arg(long, conflicts_with = "endpoint")]
        function: Option<String>,
        /// HTTP endpoint for an api tool
        #[arg(long)]
        endpoint: Option<String>,
        /// HTTP method for an api tool
        #[arg(long, default_value = "GET")]
        method: String,
        /// Request header (format: "Name: value")
        #[arg(long, requires = "endpoint")]
        header: Vec<String>,
        /// Declared parameter (format: "name:type")
        #[arg(short, long)]
        param: Vec<String>,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ToolAddOutput {
    pub tool_id: String,
    pub name: String,
    pub kind: String,
}

impl CommandOutput for ToolAddOutput {
    fn to_human(&self) -> String {
        format!("Saved {} tool {} ({})", self.kind, self.tool_id, self.name)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Parse "name:type" parameter declarations; the type defaults to string.
fn parse_params(params: &[String]) -> Result<Vec<(String, ParameterSpec)>> {
    params
        .iter()
        .map(|param| {
            let (name, param_type) = param.split_once(':').unwrap_or((param.as_str(), "string"));
            let name = name.trim();
            if name.is_empty() {
                bail!("Invalid parameter '{param}', expected name:type");
            }
            Ok((
                name.to_string(),
                ParameterSpec {
                    param_type: param_type.trim().to_string(),
                    default: None,
                    description: None,
                },
            ))
        })
        .collect()
}

fn parse_headers(headers: &[String]) -> Result<HashMap<String, String>> {
    headers
        .iter()
        .map(|header| match header.split_once(':') {
            Some((name, value)) => Ok((name.trim().to_string(), value.trim().to_string())),
            None => bail!("Invalid header '{header}', expected 'Name: value'"),
        })
        .collect()
}

/// Tool configuration described by `tool add` arguments.
fn build_tool(command: ToolCommands) -> Result<ToolConfig> {
    let ToolCommands::Add {
        tool_id,
        name,
        description,
        function,
        endpoint,
        method,
        header,
        param,
    } = command;

    let tool = match (function, endpoint) {
        (Some(code), None) => ToolConfig::function(tool_id, name, code),
        (None, Some(endpoint)) => ToolConfig::api(
            tool_id,
            name,
            ApiConfig {
                endpoint,
                method: method.to_uppercase(),
                headers: parse_headers(&header)?,
                query_params: Map::new(),
                body: Map::new(),
            },
        ),
        _ => bail!("Provide exactly one of --function or --endpoint"),
    };

    let tool = parse_params(&param)?
        .into_iter()
        .fold(tool.with_description(description), |tool, (name, spec)| {
            tool.with_parameter(name, spec)
        });
    Ok(tool)
}

pub async fn execute(args: ToolArgs, context: &AppContext, json_mode: bool) -> Result<()> {
    let tool = build_tool(args.command)?;

    ToolBinder::default()
        .bind(&tool)
        .with_context(|| format!("Tool {} cannot be bound", tool.id))?;
    context
        .catalog
        .save_tool(&tool)
        .await
        .context("Failed to save tool")?;

    output(
        &ToolAddOutput {
            tool_id: tool.id,
            name: tool.name,
            kind: tool.kind.as_str().to_string(),
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ToolKind;

    fn add(function: Option<&str>, endpoint: Option<&str>, param: &[&str]) -> ToolCommands {
        ToolCommands::Add {
            tool_id: "t1".to_string(),
            name: "lookup".to_string(),
            description: "Looks things up".to_string(),
            function: function.map(str::to_string),
            endpoint: endpoint.map(str::to_string),
            method: "post".to_string(),
            header: vec!["X-Key: secret".to_string()],
            param: param.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_build_function_tool() {
        let tool = build_tool(add(Some("word_count"), None, &["text"])).unwrap();
        assert_eq!(tool.kind, ToolKind::Function);
        assert_eq!(tool.description, "Looks things up");
        assert_eq!(tool.parameters_schema["text"].param_type, "string");
        assert!(ToolBinder::default().bind(&tool).is_ok());
    }

    #[test]
    fn test_build_api_tool() {
        let tool = build_tool(add(None, Some("https://example.test/search"), &["q:string", "limit:integer"]))
            .unwrap();
        let api = tool.api_config.as_ref().unwrap();
        assert_eq!(api.method, "POST");
        assert_eq!(api.headers["X-Key"], "secret");
        assert_eq!(tool.parameters_schema["limit"].param_type, "integer");
    }

    #[test]
    fn test_build_requires_one_kind() {
        assert!(build_tool(add(None, None, &[])).is_err());
        assert!(build_tool(add(Some("echo"), None, &[":string"])).is_err());
    }

    #[test]
    fn test_unknown_function_does_not_bind() {
        let tool = build_tool(add(Some("not_registered"), None, &[])).unwrap();
        assert!(ToolBinder::default().bind(&tool).is_err());
    }
}
