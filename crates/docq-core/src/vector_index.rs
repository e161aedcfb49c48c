//! Vector index trait and the chunk types that flow through it

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// A chunk of a source document, ready for embedding and indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Point identity in the index
    pub id: Uuid,
    /// Human-readable identity in the form `{doc_id}:{ordinal:04}`
    pub chunk_id: String,
    pub text: String,
    pub doc_name: String,
    /// Present once the chunk has been embedded
    pub vector: Option<Vec<f32>>,
}

/// A scored passage returned from similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub score: f32,
    pub chunk_id: String,
    pub text: String,
    pub doc_name: String,
}

/// Trait for vector indexes (e.g., Qdrant)
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the backing collection if it does not exist yet
    ///
    /// Fails when an existing collection was created with a different
    /// vector dimension than the one configured.
    async fn ensure_collection(&self) -> Result<()>;

    /// Upsert embedded chunks; every chunk must carry a vector
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Similarity search, best matches first
    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<RetrievedPassage>>;
}
