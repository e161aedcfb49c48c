//! Ollama integration for DocQ
//!
//! This crate provides the Ollama implementations of the ChatBackend and
//! Embedder traits: a streaming `/api/chat` client with tool-calling support
//! and a batched `/api/embed` client.

mod client;
mod config;
mod embeddings;

#[cfg(test)]
mod tests;

pub use client::OllamaChat;
pub use config::OllamaConfig;
pub use embeddings::OllamaEmbedder;

// Re-export core types for convenience
pub use docq_core::{
    ChatBackend, ChatStream, Completion, Embedder, Error, Message, Result, StreamChunk,
    ToolCall, ToolSpec,
};
