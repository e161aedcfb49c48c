//! Embedding gateway trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for embedding backends (e.g., Ollama)
///
/// Implementations must return exactly one vector per input text, in input
/// order, or fail the whole batch.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving order
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
