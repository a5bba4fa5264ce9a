use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::registry::{accepts_dimensions, remote_model_dimensions};
use super::{BackendKind, EmbeddingBackend};
use crate::error::{ConfigError, EmbeddingError};
use crate::models::{API_KEY_ENV, EmbeddingConfig};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Debug, Clone)]
pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: usize,
    /// Sent only to models that can shorten their output.
    requested_dimensions: Option<usize>,
}

impl RemoteEmbedder {
    /// Build a client using the API key from `OPENAI_API_KEY`.
    pub fn from_env(config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingCredential(API_KEY_ENV))?;
        Self::new(&api_key, config)
    }

    pub fn new(api_key: &str, config: &EmbeddingConfig) -> Result<Self, ConfigError> {
        let dimensions = config
            .dimensions
            .or_else(|| remote_model_dimensions(&config.model))
            .ok_or_else(|| ConfigError::UnknownModel {
                model: config.model.clone(),
                available: "text-embedding-3-small, text-embedding-3-large, \
                            text-embedding-ada-002 (or set embedding.dimensions)"
                    .to_string(),
            })?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| ConfigError::ValidationError("invalid API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions,
            requested_dimensions: config.dimensions,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Embed `texts` with `model` instead of the configured one.
    pub async fn embed_with_model(
        &self,
        texts: &[String],
        model: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model,
            input: texts,
            dimensions: self.requested_dimensions.filter(|_| accepts_dimensions(model)),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else if e.is_connect() {
                    EmbeddingError::ConnectionError(e.to_string())
                } else {
                    EmbeddingError::RequestError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::ContractViolation(format!(
                "{} embeddings returned for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }
        if let Some((position, entry)) = parsed
            .data
            .iter()
            .enumerate()
            .find(|(position, entry)| entry.index != *position)
        {
            return Err(EmbeddingError::ContractViolation(format!(
                "embedding index {} found where {} was expected",
                entry.index, position
            )));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingBackend for RemoteEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_with_model(texts, &self.model).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn model(&self) -> &str {
        &self.model
    }
}
