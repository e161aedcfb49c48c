//! Core traits and types for DocQ
//!
//! This crate defines the fundamental traits and types used across the DocQ
//! system. It provides capability-facing interfaces for chat backends,
//! embedding gateways, vector indexes, and chat stores, making the system
//! test-friendly and extensible.

pub mod chat;
pub mod chat_store;
pub mod embedder;
pub mod error;
pub mod message;
pub mod vector_index;

pub use chat::{
    ChatBackend, ChatStream, Completion, FragmentArguments, StreamChunk, Tool,
    ToolCallAccumulator, ToolCallFragment, ToolSpec,
};
pub use chat_store::ChatStore;
pub use embedder::Embedder;
pub use error::{Error, Result};
pub use message::{Message, ToolCall};
pub use vector_index::{Chunk, RetrievedPassage, VectorIndex};
