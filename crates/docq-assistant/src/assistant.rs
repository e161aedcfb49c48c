//! The conversation orchestrator

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use docq_core::{
    ChatBackend, ChatStore, Completion, Error, Message, Result, Tool, ToolCallAccumulator,
    ToolSpec,
};

use crate::prompts::{MAIN_SYSTEM_PROMPT, RAG_SYSTEM_PROMPT};

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 3;

/// Events surfaced to the consumer while a turn runs
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A streamed piece of assistant text
    Delta(String),
    /// The turn finished; `truncated` marks an answer cut off at the tool
    /// round cap
    Done { content: String, truncated: bool },
}

/// Summary of a completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub content: String,
    pub tool_rounds: usize,
    pub truncated: bool,
}

/// Runs chat turns against a streaming backend, executing knowledge base
/// lookups the model requests along the way
pub struct RagAssistant<B, S, T> {
    backend: Arc<B>,
    store: Arc<S>,
    tool: Arc<T>,
    max_tool_rounds: usize,
}

impl<B, S, T> RagAssistant<B, S, T>
where
    B: ChatBackend,
    S: ChatStore,
    T: Tool,
{
    pub fn new(backend: Arc<B>, store: Arc<S>, tool: Arc<T>) -> Self {
        Self {
            backend,
            store,
            tool,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Run one turn of an existing chat
    ///
    /// Content deltas go to `events` as they arrive; the finished turn is
    /// appended to the store in one batch. If the receiver goes away the
    /// turn is abandoned and nothing is persisted.
    pub async fn run_turn(
        &self,
        chat_id: &str,
        user_message: &str,
        events: mpsc::Sender<ChatEvent>,
    ) -> Result<TurnOutcome> {
        if !self.store.chat_exists(chat_id).await? {
            return Err(Error::ChatStore(format!("unknown chat: {chat_id}")));
        }

        let specs = [self.tool.spec()];
        let history = self.store.messages(chat_id, None).await?;

        let mut conversation = Vec::with_capacity(history.len() + 2);
        conversation.push(Message::system(MAIN_SYSTEM_PROMPT));
        conversation.extend(history);
        conversation.push(Message::user(user_message));

        let mut new_messages = vec![Message::user(user_message)];
        let mut tool_rounds = 0;
        let (content, truncated) = loop {
            let completion = self.stream_once(&conversation, &specs, &events).await?;

            if completion.tool_calls.is_empty() {
                new_messages.push(Message::assistant(completion.content.clone()));
                break (completion.content, false);
            }
            if tool_rounds >= self.max_tool_rounds {
                // cap reached: keep the text, drop the unexecuted calls so
                // stored history never holds a call without its result
                new_messages.push(Message::assistant(completion.content.clone()));
                break (completion.content, true);
            }
            tool_rounds += 1;

            let content = (!completion.content.is_empty()).then(|| completion.content.clone());
            let assistant =
                Message::assistant_with_tool_calls(content, completion.tool_calls.clone());
            conversation.push(assistant.clone());
            new_messages.push(assistant);

            for call in &completion.tool_calls {
                let result = self.tool.execute(&call.arguments).await?;
                let message = Message::tool(call.id.clone(), result);
                conversation.push(message.clone());
                new_messages.push(message);
            }

            // with passages in hand, the model answers from sources only
            conversation[0] = Message::system(RAG_SYSTEM_PROMPT);
        };

        events
            .send(ChatEvent::Done {
                content: content.clone(),
                truncated,
            })
            .await
            .map_err(|_| {
                Error::Cancelled("receiver dropped before the turn finished".to_string())
            })?;
        self.store.append_messages(chat_id, &new_messages).await?;

        Ok(TurnOutcome {
            content,
            tool_rounds,
            truncated,
        })
    }

    /// Stream one completion, forwarding content deltas as they arrive
    async fn stream_once(
        &self,
        conversation: &[Message],
        specs: &[ToolSpec],
        events: &mpsc::Sender<ChatEvent>,
    ) -> Result<Completion> {
        let mut stream = self.backend.stream_chat(conversation, specs).await?;
        let mut accumulator = ToolCallAccumulator::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(delta) = chunk.content.as_deref() {
                if !delta.is_empty()
                    && events
                        .send(ChatEvent::Delta(delta.to_string()))
                        .await
                        .is_err()
                {
                    return Err(Error::Cancelled("receiver dropped mid-stream".to_string()));
                }
            }
            accumulator.push(&chunk);
            if chunk.done {
                break;
            }
        }

        Ok(accumulator.finalize(specs))
    }
}
