//! OpenAI-compatible embedding provider.
//!
//! Talks to any `/embeddings` endpoint shaped like OpenAI's (Azure OpenAI,
//! local inference servers).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::EmbeddingProvider;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_BATCH_SIZE: usize = 2048;

/// OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbeddingProvider {
    /// Build from configuration. The key comes from `api_key` or
    /// `OPENAI_API_KEY`.
    pub fn from_config(config: &EmbeddingConfig, client: reqwest::Client) -> DomainResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                DomainError::ValidationFailed(
                    "OpenAI API key not set. Set OPENAI_API_KEY or knowledge.embedding.api_key"
                        .to_string(),
                )
            })?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    async fn call_embeddings_api(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let request_body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| DomainError::RetrievalUnavailable(format!("embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::RetrievalUnavailable(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        let result: EmbeddingsResponse = response.json().await.map_err(|e| {
            DomainError::SerializationError(format!("failed to parse embedding response: {e}"))
        })?;

        if result.data.len() != texts.len() {
            return Err(DomainError::RetrievalUnavailable(format!(
                "embedding API returned {} vectors for {} inputs",
                result.data.len(),
                texts.len()
            )));
        }

        let mut data = result.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        let mut vectors = self.call_embeddings_api(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| DomainError::RetrievalUnavailable("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_SIZE) {
            vectors.extend(self.call_embeddings_api(batch).await?);
        }
        Ok(vectors)
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
