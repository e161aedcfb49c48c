//! Qdrant-backed vector index

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorsConfigKind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde::{Deserialize, Serialize};

use docq_core::{Chunk, Error, Result, RetrievedPassage, VectorIndex};

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "documents";
pub const DEFAULT_DIMENSIONS: u64 = 384;

/// Connection settings for the Qdrant index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
    pub dimensions: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

impl QdrantConfig {
    /// Load settings from the environment, with a `.env` file honored
    /// when present
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| DEFAULT_QDRANT_URL.to_string());
        let collection =
            std::env::var("QDRANT_COLLECTION").unwrap_or_else(|_| DEFAULT_COLLECTION.to_string());
        let dimensions = std::env::var("EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_DIMENSIONS);
        Self {
            url,
            collection,
            dimensions,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: u64) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// Vector index backed by a Qdrant collection
pub struct QdrantIndex {
    client: Qdrant,
    config: QdrantConfig,
}

impl QdrantIndex {
    /// Build a client for the configured server; no round trip happens
    /// until the first operation
    pub fn new(config: QdrantConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| {
                Error::VectorIndex(format!("failed to build Qdrant client for {}: {e}", config.url))
            })?;
        Ok(Self { client, config })
    }

    async fn collection_exists(&self) -> Result<bool> {
        self.client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| Error::VectorIndex(format!("failed to check collection: {e}")))
    }

    /// Vector size the existing collection was created with, when it uses
    /// a single unnamed vector
    async fn existing_dimensions(&self) -> Result<Option<u64>> {
        let info = self
            .client
            .collection_info(&self.config.collection)
            .await
            .map_err(|e| Error::VectorIndex(format!("failed to read collection info: {e}")))?;
        let size = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|kind| match kind {
                VectorsConfigKind::Params(params) => Some(params.size),
                VectorsConfigKind::ParamsMap(_) => None,
            });
        Ok(size)
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self) -> Result<()> {
        if self.collection_exists().await? {
            if let Some(size) = self.existing_dimensions().await? {
                if size != self.config.dimensions {
                    return Err(Error::Configuration(format!(
                        "collection '{}' holds {size}-dimensional vectors but {} are configured",
                        self.config.collection, self.config.dimensions
                    )));
                }
            }
            return Ok(());
        }

        let create = CreateCollectionBuilder::new(&self.config.collection).vectors_config(
            VectorParamsBuilder::new(self.config.dimensions, Distance::Cosine),
        );
        if let Err(e) = self.client.create_collection(create).await {
            // lost a create race with a concurrent ingestion
            let now_exists = self.collection_exists().await.unwrap_or(false);
            if !now_exists {
                return Err(Error::VectorIndex(format!(
                    "failed to create collection '{}': {e}",
                    self.config.collection
                )));
            }
        }
        Ok(())
    }

    async fn upsert(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut points = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = chunk.vector.clone().ok_or_else(|| {
                Error::VectorIndex(format!("chunk {} has no vector", chunk.chunk_id))
            })?;
            let mut payload = Payload::new();
            payload.insert("chunk_id", chunk.chunk_id.clone());
            payload.insert("text", chunk.text.clone());
            payload.insert("doc_name", chunk.doc_name.clone());
            points.push(PointStruct::new(chunk.id.to_string(), vector, payload));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, points).wait(true))
            .await
            .map_err(|e| Error::VectorIndex(format!("failed to upsert points: {e}")))?;
        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        // a missing collection means nothing was indexed yet
        if !self.collection_exists().await? {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.config.collection, vector, top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| Error::VectorIndex(format!("search failed: {e}")))?;

        Ok(response.result.into_iter().map(passage_from_point).collect())
    }
}

fn passage_from_point(point: ScoredPoint) -> RetrievedPassage {
    let fallback_id = point
        .id
        .as_ref()
        .map(point_id_string)
        .unwrap_or_default();
    RetrievedPassage {
        score: point.score,
        chunk_id: payload_str(&point.payload, "chunk_id").unwrap_or(fallback_id),
        text: payload_str(&point.payload, "text").unwrap_or_default(),
        doc_name: payload_str(&point.payload, "doc_name").unwrap_or_default(),
    }
}

fn point_id_string(id: &PointId) -> String {
    match &id.point_id_options {
        Some(PointIdOptions::Uuid(uuid)) => uuid.clone(),
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)?.kind.as_ref()? {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    }
}
