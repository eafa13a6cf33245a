//! HTTP API tools.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ApiConfig;
use crate::domain::ports::ToolInvoker;

/// Invokes an HTTP endpoint described by an [`ApiConfig`].
///
/// `{name}` placeholders in the endpoint are filled from the call arguments.
/// Remaining arguments go to the query string for GET and DELETE and into
/// the JSON body otherwise, on top of the configured static values.
#[derive(Debug, Clone)]
pub struct ApiTool {
    name: String,
    client: reqwest::Client,
    method: Method,
    config: ApiConfig,
}

impl ApiTool {
    pub fn new(name: impl Into<String>, config: ApiConfig, client: reqwest::Client) -> DomainResult<Self> {
        let name = name.into();
        if config.endpoint.trim().is_empty() {
            return Err(DomainError::ToolBindFailed {
                tool: name,
                reason: "api_config.endpoint is empty".to_string(),
            });
        }
        let method = Method::from_bytes(config.method.to_uppercase().as_bytes()).map_err(|_| {
            DomainError::ToolBindFailed {
                tool: name.clone(),
                reason: format!("invalid HTTP method '{}'", config.method),
            }
        })?;

        Ok(Self {
            name,
            client,
            method,
            config,
        })
    }

    fn sends_query(&self) -> bool {
        self.method == Method::GET || self.method == Method::DELETE
    }

    fn fill_endpoint(&self, arguments: &mut Map<String, Value>) -> String {
        let mut endpoint = self.config.endpoint.clone();
        let placeholders: Vec<String> = arguments
            .keys()
            .filter(|k| endpoint.contains(&format!("{{{k}}}")))
            .cloned()
            .collect();
        for key in placeholders {
            if let Some(value) = arguments.remove(&key) {
                endpoint = endpoint.replace(&format!("{{{key}}}"), &plain_text(&value));
            }
        }
        endpoint
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ToolInvoker for ApiTool {
    async fn invoke(&self, arguments: Value) -> DomainResult<Value> {
        let mut arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(DomainError::ToolExecutionFailed {
                    tool: self.name.clone(),
                    reason: format!("arguments must be an object, got {other}"),
                })
            }
        };
        let endpoint = self.fill_endpoint(&mut arguments);

        let mut request = self.client.request(self.method.clone(), &endpoint);
        for (header, value) in &self.config.headers {
            request = request.header(header, value);
        }

        if self.sends_query() {
            let mut query = self.config.query_params.clone();
            query.extend(arguments);
            let pairs: Vec<(String, String)> = query.iter().map(|(k, v)| (k.clone(), plain_text(v))).collect();
            request = request.query(&pairs);
        } else {
            if !self.config.query_params.is_empty() {
                let pairs: Vec<(String, String)> = self
                    .config
                    .query_params
                    .iter()
                    .map(|(k, v)| (k.clone(), plain_text(v)))
                    .collect();
                request = request.query(&pairs);
            }
            let mut body = self.config.body.clone();
            body.extend(arguments);
            request = request.json(&body);
        }

        debug!(tool = %self.name, method = %self.method, endpoint = %endpoint, "Calling API tool");
        let response = request.send().await.map_err(|e| DomainError::ToolExecutionFailed {
            tool: self.name.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| DomainError::ToolExecutionFailed {
            tool: self.name.clone(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(DomainError::ToolExecutionFailed {
                tool: self.name.clone(),
                reason: format!("HTTP {status}: {text}"),
            });
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn config(endpoint: String, method: &str) -> ApiConfig {
        ApiConfig {
            endpoint,
            method: method.to_string(),
            headers: [("x-token".to_string(), "secret".to_string())].into(),
            query_params: Map::new(),
            body: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_get_sends_arguments_as_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/weather/paris")
            .match_header("x-token", "secret")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("units".into(), "metric".into()),
                Matcher::UrlEncoded("days".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"temp": 21}"#)
            .create_async()
            .await;

        let mut cfg = config(format!("{}/weather/{{city}}", server.url()), "get");
        cfg.query_params.insert("units".into(), json!("metric"));
        let tool = ApiTool::new("weather", cfg, reqwest::Client::new()).unwrap();

        let result = tool.invoke(json!({"city": "paris", "days": 2})).await.unwrap();
        assert_eq!(result["temp"], 21);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_merges_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/notes")
            .match_body(Matcher::Json(json!({"folder": "inbox", "text": "hi"})))
            .with_status(201)
            .with_body("created")
            .create_async()
            .await;

        let mut cfg = config(format!("{}/notes", server.url()), "POST");
        cfg.body.insert("folder".into(), json!("inbox"));
        let tool = ApiTool::new("notes", cfg, reqwest::Client::new()).unwrap();

        let result = tool.invoke(json!({"text": "hi"})).await.unwrap();
        assert_eq!(result, json!("created"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/x").with_status(500).create_async().await;

        let tool = ApiTool::new("x", config(format!("{}/x", server.url()), "GET"), reqwest::Client::new()).unwrap();
        let err = tool.invoke(Value::Null).await.unwrap_err();
        assert!(matches!(err, DomainError::ToolExecutionFailed { .. }));
    }

    #[test]
    fn test_bind_rejects_bad_config() {
        let client = reqwest::Client::new();
        assert!(ApiTool::new("a", config(String::new(), "GET"), client.clone()).is_err());
        assert!(ApiTool::new("a", config("http://x".into(), "NOT A METHOD"), client).is_err());
    }
}
