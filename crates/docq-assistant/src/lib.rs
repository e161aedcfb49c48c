//! Conversation orchestration for DocQ
//!
//! Drives a chat turn end to end: seed the conversation from stored
//! history, stream the model's answer, execute requested knowledge base
//! lookups, and persist the finished turn.

mod assistant;
mod prompts;
mod store;


pub use assistant::{ChatEvent, DEFAULT_MAX_TOOL_ROUNDS, RagAssistant, TurnOutcome};
pub use prompts::{MAIN_SYSTEM_PROMPT, RAG_SYSTEM_PROMPT};
pub use store::{ChatSummary, MemoryChatStore, new_chat_id};

pub use docq_core::{ChatBackend, ChatStore, Error, Message, Result, Tool};
