//! In-memory chat history store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use docq_core::{ChatStore, Error, Message, Result};

/// Short chat identifier, unique enough for a process-local store
pub fn new_chat_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Identity and creation time of a stored chat
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub chat_id: String,
    pub created_at: DateTime<Utc>,
}

struct ChatRecord {
    created_at: DateTime<Utc>,
    messages: Vec<Message>,
}

/// Process-local chat store used by the CLI and tests
#[derive(Default)]
pub struct MemoryChatStore {
    chats: RwLock<HashMap<String, ChatRecord>>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All chats, newest first
    pub fn chats(&self) -> Result<Vec<ChatSummary>> {
        let chats = self
            .chats
            .read()
            .map_err(|e| Error::ChatStore(format!("lock error: {e}")))?;
        let mut summaries: Vec<ChatSummary> = chats
            .iter()
            .map(|(chat_id, record)| ChatSummary {
                chat_id: chat_id.clone(),
                created_at: record.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn create_chat(&self, chat_id: &str) -> Result<()> {
        let mut chats = self
            .chats
            .write()
            .map_err(|e| Error::ChatStore(format!("lock error: {e}")))?;
        chats.insert(
            chat_id.to_string(),
            ChatRecord {
                created_at: Utc::now(),
                messages: Vec::new(),
            },
        );
        Ok(())
    }

    async fn chat_exists(&self, chat_id: &str) -> Result<bool> {
        let chats = self
            .chats
            .read()
            .map_err(|e| Error::ChatStore(format!("lock error: {e}")))?;
        Ok(chats.contains_key(chat_id))
    }

    async fn append_messages(&self, chat_id: &str, messages: &[Message]) -> Result<()> {
        let mut chats = self
            .chats
            .write()
            .map_err(|e| Error::ChatStore(format!("lock error: {e}")))?;
        let record = chats
            .get_mut(chat_id)
            .ok_or_else(|| Error::ChatStore(format!("unknown chat: {chat_id}")))?;
        record.messages.extend_from_slice(messages);
        Ok(())
    }

    async fn messages(&self, chat_id: &str, last_n: Option<usize>) -> Result<Vec<Message>> {
        let chats = self
            .chats
            .read()
            .map_err(|e| Error::ChatStore(format!("lock error: {e}")))?;
        let record = chats
            .get(chat_id)
            .ok_or_else(|| Error::ChatStore(format!("unknown chat: {chat_id}")))?;
        let messages = &record.messages;
        let skip = match last_n {
            Some(n) => messages.len().saturating_sub(n),
            None => 0,
        };
        Ok(messages[skip..].to_vec())
    }
}
