//! Text Embeddings via OpenAI
//!
//! Wraps a single `/v1/embeddings` call. Failures are soft: [`Embedder::get_embedding`]
//! logs and returns `None`, [`Embedder::try_embed`] keeps the reason.
//!
//! The remote call sits behind [`EmbeddingApi`] so tests can swap in a fake.

use crate::config::Config;
use crate::product::truncate_for_embedding;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Vector length produced by `text-embedding-ada-002`
pub const EMBEDDING_DIMENSIONS: usize = 1536;

/// Model used when none is configured
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Default OpenAI API root
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Embedding errors
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("No text provided for embedding")]
    EmptyInput,

    #[error("Embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Embedding API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Expected exactly one embedding, got {0}")]
    UnexpectedCount(usize),

    #[error("Invalid embedding dimensions: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

/// Request body for `/embeddings`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
}

/// Response body from `/embeddings`
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    #[serde(default)]
    pub index: usize,
    pub embedding: Vec<f32>,
}

impl EmbeddingResponse {
    /// Build a response holding the given vectors, indexed in order
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Self {
        Self {
            data: vectors
                .into_iter()
                .enumerate()
                .map(|(index, embedding)| EmbeddingData { index, embedding })
                .collect(),
        }
    }
}

/// Remote embeddings endpoint
#[async_trait]
pub trait EmbeddingApi: Send + Sync {
    async fn create(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, EmbeddingError>;
}

#[async_trait]
impl<T: EmbeddingApi + ?Sized> EmbeddingApi for Arc<T> {
    async fn create(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, EmbeddingError> {
        (**self).create(request).await
    }
}

/// HTTP client for OpenAI-compatible embedding endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OpenAiClient {
    /// Create a client with bearer auth baked into the default headers
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, EmbeddingError> {
        if api_key.trim().is_empty() {
            return Err(EmbeddingError::Config("missing OpenAI API key".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| EmbeddingError::Config("invalid OpenAI API key".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmbeddingApi for OpenAiClient {
    async fn create(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, EmbeddingError> {
        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        parsed.data.sort_by_key(|entry| entry.index);
        Ok(parsed)
    }
}

/// Single-text embedder with a fixed model and expected dimensionality
pub struct Embedder<A> {
    api: A,
    model: String,
    dimensions: usize,
}

impl<A: EmbeddingApi> Embedder<A> {
    pub fn new(api: A, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            api,
            model: model.into(),
            dimensions,
        }
    }

    /// Use model and dimensions from config
    pub fn from_config(api: A, config: &Config) -> Self {
        Self::new(api, config.embedding_model.clone(), config.embedding_dimensions)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text. Makes at most one remote call.
    pub async fn try_embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let input = truncate_for_embedding(trimmed).trim_end();
        if input.len() < trimmed.len() {
            debug!(
                "Truncated embedding input from {} to {} bytes",
                trimmed.len(),
                input.len()
            );
        }

        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: vec![input.to_string()],
        };

        let mut response = self.api.create(request).await?;
        if response.data.len() != 1 {
            return Err(EmbeddingError::UnexpectedCount(response.data.len()));
        }

        let embedding = response.data.swap_remove(0).embedding;
        if embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    /// Embed one text, logging and discarding any failure
    pub async fn get_embedding(&self, text: &str) -> Option<Vec<f32>> {
        match self.try_embed(text).await {
            Ok(embedding) => Some(embedding),
            Err(EmbeddingError::EmptyInput) => {
                debug!("No text provided for embedding generation");
                None
            }
            Err(e @ EmbeddingError::DimensionMismatch { .. }) => {
                error!("{}", e);
                None
            }
            Err(e) => {
                warn!("Error calling embedding API: {}", e);
                None
            }
        }
    }
}
