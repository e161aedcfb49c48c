//! Ollama embeddings client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use docq_core::{Embedder, Error, Result};

use crate::config::OllamaConfig;

/// Embedding client for an Ollama server
///
/// Prefers the batched `/api/embed` endpoint and falls back to the per-item
/// `/api/embeddings` endpoint on older Ollama versions.
pub struct OllamaEmbedder {
    config: OllamaConfig,
    client: Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct LegacyEmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct LegacyEmbeddingsResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create a new embeddings client from configuration
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Embedding(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new embeddings client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env())
    }

    pub fn model(&self) -> &str {
        &self.config.embedding_model
    }

    /// Per-item fallback for Ollama versions without `/api/embed`
    async fn embed_each_legacy(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embeddings", self.config.host);
        let mut vectors = Vec::with_capacity(texts.len());

        for text in texts {
            let request = LegacyEmbeddingsRequest {
                model: &self.config.embedding_model,
                prompt: text,
            };
            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    Error::Embedding(format!(
                        "failed to reach Ollama at {url} (is it running?): {e}"
                    ))
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(Error::Embedding(format!(
                    "Ollama embeddings request failed with status {status}: {error_text}"
                )));
            }

            let parsed: LegacyEmbeddingsResponse = response
                .json()
                .await
                .map_err(|e| Error::Embedding(format!("invalid embeddings response: {e}")))?;
            vectors.push(parsed.embedding);
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_many(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("embedding backend returned no vector".to_string()))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.config.host);
        let request = EmbedRequest {
            model: &self.config.embedding_model,
            input: texts,
            truncate: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::Embedding(format!(
                    "failed to reach Ollama at {url} (is it running?): {e}"
                ))
            })?;

        if !response.status().is_success() {
            // Older Ollama versions answer 404 here; retry per item.
            return self.embed_each_legacy(texts).await;
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("invalid embed response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(Error::Protocol(format!(
                "Ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed.embeddings)
    }
}
