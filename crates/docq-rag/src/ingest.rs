//! Document ingestion pipeline
//!
//! Extract, chunk, embed, and index a document in one pass. Embedding runs
//! in concurrent batches; nothing is written to the index until every batch
//! has come back.

use std::path::Path;
use std::sync::Arc;

use futures::future;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docq_core::{Chunk, Embedder, Error, Result, VectorIndex};

use crate::extract::{DocumentKind, doc_name_from_filename, extract_text};
use crate::splitter::FixedSizeSplitter;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// Chunking and batching settings for ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embed_batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }
}

impl IngestConfig {
    /// Load settings from the environment, with a `.env` file honored
    /// when present
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let chunk_size = std::env::var("CHUNK_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.chunk_size);
        let chunk_overlap = std::env::var("CHUNK_OVERLAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.chunk_overlap);
        Self {
            chunk_size,
            chunk_overlap,
            embed_batch_size: defaults.embed_batch_size,
        }
    }
}

/// Ingests documents into a vector index
pub struct IngestPipeline<E, V> {
    embedder: Arc<E>,
    index: Arc<V>,
    splitter: FixedSizeSplitter,
    batch_size: usize,
}

impl<E: Embedder, V: VectorIndex> IngestPipeline<E, V> {
    pub fn new(embedder: Arc<E>, index: Arc<V>, config: IngestConfig) -> Result<Self> {
        if config.embed_batch_size == 0 {
            return Err(Error::Configuration(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        let splitter = FixedSizeSplitter::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            embedder,
            index,
            splitter,
            batch_size: config.embed_batch_size,
        })
    }

    /// Ingest a document given its raw bytes and original file name;
    /// returns the number of chunks indexed
    pub async fn ingest(&self, bytes: Vec<u8>, file_name: &str) -> Result<usize> {
        let kind = DocumentKind::from_name(file_name);
        let doc_name = doc_name_from_filename(file_name);
        let text = extract_text(bytes, kind).await?;
        if text.trim().is_empty() {
            return Ok(0);
        }

        let pieces = self.splitter.split(&text);
        if pieces.is_empty() {
            return Ok(0);
        }

        let doc_id = short_doc_id();
        let mut chunks: Vec<Chunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                id: Uuid::new_v4(),
                chunk_id: format!("{doc_id}:{:04}", i + 1),
                text,
                doc_name: doc_name.clone(),
                vector: None,
            })
            .collect();

        let vectors = self.embed_all(&chunks).await?;
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.vector = Some(vector);
        }

        self.index.ensure_collection().await?;
        self.index.upsert(&chunks).await?;
        Ok(chunks.len())
    }

    /// Read a file from disk and ingest it
    pub async fn ingest_file(&self, path: &Path) -> Result<usize> {
        let bytes = tokio::fs::read(path).await?;
        let name = path.to_string_lossy();
        self.ingest(bytes, &name).await
    }

    /// Embed every chunk text in concurrent batches, re-joined in order
    async fn embed_all(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let batches = texts
            .chunks(self.batch_size)
            .map(|batch| self.embedder.embed_many(batch));
        let results = future::try_join_all(batches).await?;

        let vectors: Vec<Vec<f32>> = results.into_iter().flatten().collect();
        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "embedded {} of {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        Ok(vectors)
    }
}

fn short_doc_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
