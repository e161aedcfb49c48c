//! Chat history storage trait

use async_trait::async_trait;

use crate::error::Result;
use crate::message::Message;

/// Trait for conversation history stores
///
/// Messages append in arrival order and reads never reorder them.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Create a chat, replacing any existing chat with the same id
    async fn create_chat(&self, chat_id: &str) -> Result<()>;

    /// Whether a chat with this id exists
    async fn chat_exists(&self, chat_id: &str) -> Result<bool>;

    /// Append messages to an existing chat
    async fn append_messages(&self, chat_id: &str, messages: &[Message]) -> Result<()>;

    /// Read messages, optionally only the last `n`
    async fn messages(&self, chat_id: &str, last_n: Option<usize>) -> Result<Vec<Message>>;
}
