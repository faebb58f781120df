//! Embedding providers.
//!
//! Ingestion and search only see the [`EmbeddingProvider`] trait. Production
//! runs use [`OpenAiEmbedder`], which calls an OpenAI-compatible HTTP
//! endpoint; [`HashEmbedder`] is deterministic and offline, for tests and
//! trying the tool without an API key.

use crate::config::{EmbeddingSettings, Number, ProviderKind};
use crate::error::{Error, Result};
use crate::vector_ops::normalize_vector;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;

pub trait EmbeddingProvider {
    /// Embed one piece of text.
    fn embed(&self, text: &str) -> Result<Vec<Number>>;

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;
}

/// Build the provider selected in the settings.
pub fn from_settings(settings: &EmbeddingSettings) -> Result<Box<dyn EmbeddingProvider>> {
    let provider: Box<dyn EmbeddingProvider> = match settings.provider {
        ProviderKind::OpenAi => {
            let api_key = env::var(&settings.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    Error::ProviderFailure(format!("{} is not set", settings.api_key_env))
                })?;
            Box::new(OpenAiEmbedder::new(
                api_key,
                settings.endpoint.clone(),
                settings.model.clone(),
                settings.dimensions,
            ))
        }
        ProviderKind::Hash => Box::new(HashEmbedder::new(settings.dimensions)),
    };
    log::debug!("Embedding provider: {} ({} dims)", provider.name(), provider.dimensions());
    Ok(provider)
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<Number>,
}

/// Blocking client for the `/v1/embeddings` API.
///
/// Failures are not retried; each one surfaces as [`Error::ProviderFailure`].
pub struct OpenAiEmbedder {
    api_key: String,
    endpoint: String,
    model: String,
    dimensions: usize,
    client: reqwest::blocking::Client,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, endpoint: String, model: String, dimensions: usize) -> Self {
        Self {
            api_key,
            endpoint,
            model,
            dimensions,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl EmbeddingProvider for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<Number>> {
        log::debug!("Requesting embedding for {} chars from {}", text.len(), self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                input: text,
                model: &self.model,
            })
            .send()
            .map_err(|e| Error::ProviderFailure(format!("API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::ProviderFailure(format!("API returned error {}: {}", status, body)));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| Error::ProviderFailure(format!("Failed to parse response: {}", e)))?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::ProviderFailure("Response contained no embedding".to_string()))?;

        if embedding.len() != self.dimensions {
            return Err(Error::ProviderFailure(format!(
                "Model {} returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Bag-of-words hashing embedder. Texts sharing words score as similar;
/// nothing beyond that is semantic.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<Number>> {
        let mut embedding = vec![0.0; self.dimensions];
        if self.dimensions == 0 {
            return Ok(embedding);
        }

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let index = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[index] += sign;
        }

        normalize_vector(&mut embedding);
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}
