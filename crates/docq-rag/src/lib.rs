//! RAG (Retrieval-Augmented Generation) pipeline for DocQ
//!
//! This crate turns raw documents into embedded, searchable chunks and
//! exposes the knowledge-base retrieval tool the chat model calls: text
//! extraction, chunking, the Qdrant vector index, the ingestion pipeline,
//! and passage formatting.

mod extract;
mod ingest;
mod qdrant;
mod splitter;
mod tool;


pub use extract::{DocumentKind, doc_name_from_filename, extract_text};
pub use ingest::{IngestConfig, IngestPipeline};
pub use qdrant::{QdrantConfig, QdrantIndex};
pub use splitter::{FixedSizeSplitter, TokenSplitter};
pub use tool::{DEFAULT_TOP_K, KNOWLEDGE_BASE_TOOL_NAME, KnowledgeBaseTool, format_sources};

// Re-export core types for convenience
pub use docq_core::{Chunk, Embedder, Error, Result, RetrievedPassage, Tool, VectorIndex};
