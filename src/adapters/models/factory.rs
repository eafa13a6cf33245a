//! Provider string to chat model resolution.

use std::sync::Arc;

use tracing::debug;

use super::{AnthropicChatModel, MockChatModel, OpenAiChatModel};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ProviderEndpoint, ProvidersConfig};
use crate::domain::ports::{ChatModel, ModelFactory, ModelSpec};

/// Builds HTTP-backed models from the providers section of the config.
#[derive(Debug, Clone)]
pub struct ProviderModelFactory {
    providers: ProvidersConfig,
    client: reqwest::Client,
}

impl ProviderModelFactory {
    pub fn new(providers: ProvidersConfig, client: reqwest::Client) -> Self {
        Self { providers, client }
    }

    /// Key lookup order: the agent's credentials env var, the configured key,
    /// then the provider's conventional env var.
    fn resolve_key(spec: &ModelSpec, endpoint: &ProviderEndpoint, default_env: &str) -> DomainResult<String> {
        if let Some(env_var) = &spec.credentials_ref {
            return std::env::var(env_var)
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    DomainError::ModelInitFailed(format!(
                        "credentials variable {env_var} is not set for provider {}",
                        spec.provider
                    ))
                });
        }

        endpoint
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(default_env).ok().filter(|k| !k.is_empty()))
            .ok_or_else(|| {
                DomainError::ModelInitFailed(format!(
                    "no API key for provider {}; set {default_env}",
                    spec.provider
                ))
            })
    }
}

impl ModelFactory for ProviderModelFactory {
    fn create(&self, spec: &ModelSpec) -> DomainResult<Arc<dyn ChatModel>> {
        if spec.model.trim().is_empty() {
            return Err(DomainError::ModelInitFailed("model name is empty".to_string()));
        }

        let provider = spec.provider.to_lowercase();
        debug!(provider = %provider, model = %spec.model, "Creating chat model");

        match provider.as_str() {
            "openai" => {
                let key = Self::resolve_key(spec, &self.providers.openai, "OPENAI_API_KEY")?;
                Ok(Arc::new(OpenAiChatModel::new(
                    self.client.clone(),
                    "openai",
                    &self.providers.openai.base_url,
                    Some(key),
                    &spec.model,
                    spec.temperature,
                )))
            }
            "anthropic" => {
                let key = Self::resolve_key(spec, &self.providers.anthropic, "ANTHROPIC_API_KEY")?;
                Ok(Arc::new(AnthropicChatModel::new(
                    self.client.clone(),
                    &self.providers.anthropic.base_url,
                    key,
                    &spec.model,
                    spec.temperature,
                )))
            }
            "ollama" => Ok(Arc::new(OpenAiChatModel::new(
                self.client.clone(),
                "ollama",
                &self.providers.ollama.base_url,
                self.providers.ollama.api_key.clone(),
                &spec.model,
                spec.temperature,
            ))),
            "mock" | "echo" => Ok(Arc::new(MockChatModel::new(&spec.model))),
            other => Err(DomainError::ModelInitFailed(format!(
                "Unsupported model provider: {other}"
            ))),
        }
    }
}
