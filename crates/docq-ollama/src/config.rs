//! Ollama configuration

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the Ollama chat and embeddings clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    pub const DEFAULT_HOST: &'static str = "http://localhost:11434";
    pub const DEFAULT_CHAT_MODEL: &'static str = "qwen3:0.6b";
    /// 384-dimension sentence embeddings, matching the default index size
    pub const DEFAULT_EMBEDDING_MODEL: &'static str = "all-minilm";

    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| Self::DEFAULT_HOST.to_string());

        let chat_model =
            env::var("OLLAMA_MODEL").unwrap_or_else(|_| Self::DEFAULT_CHAT_MODEL.to_string());

        let embedding_model = env::var("OLLAMA_EMBEDDING_MODEL")
            .unwrap_or_else(|_| Self::DEFAULT_EMBEDDING_MODEL.to_string());

        Self {
            host: normalize_host(&host),
            chat_model,
            embedding_model,
        }
    }

    /// Create configuration with an explicit host and the default models
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: normalize_host(&host.into()),
            chat_model: Self::DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: Self::DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    /// Set the chat model
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Set the embedding model
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

/// Accept `host:port` as well as full URLs, and strip trailing slashes
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
