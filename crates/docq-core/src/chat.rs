//! Chat backend trait, streaming chunk types, and tool-call accumulation
//!
//! Backends normalize their wire format into [`StreamChunk`]s. The
//! [`ToolCallAccumulator`] then merges text deltas and partial tool calls
//! into a single [`Completion`], repairing malformed tool arguments instead
//! of dropping the call.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::message::{Message, ToolCall};

/// A tool the model may call, described by a JSON schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema object for the tool arguments
    pub parameters: Value,
}

impl ToolSpec {
    /// Field names listed under `required` in the schema
    pub fn required_fields(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(|r| r.as_array())
            .map(|fields| fields.iter().filter_map(|f| f.as_str()).collect())
            .unwrap_or_default()
    }

    /// First required field, used when repairing malformed arguments
    pub fn primary_field(&self) -> Option<&str> {
        self.required_fields().first().copied()
    }
}

/// One normalized chunk of a streaming chat response
#[derive(Debug, Clone, Default)]
pub struct StreamChunk {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallFragment>,
    pub done: bool,
}

/// A partial tool call as it arrives on the stream
///
/// Fragments for the same call share an `index`; fields arrive in any order
/// and any number of pieces.
#[derive(Debug, Clone)]
pub struct ToolCallFragment {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<FragmentArguments>,
}

/// Tool arguments as a backend delivers them: an already-structured JSON
/// value, or raw text accumulated across deltas
#[derive(Debug, Clone)]
pub enum FragmentArguments {
    Structured(Value),
    Raw(String),
}

/// A fully accumulated model response
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// A stream of normalized response chunks
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Trait for streaming chat backends (e.g., Ollama)
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a streaming completion for the given conversation
    async fn stream_chat(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<ChatStream>;
}

/// A capability the orchestrator can execute on the model's behalf
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema advertised to the model
    fn spec(&self) -> ToolSpec;

    /// Run the tool with already-resolved arguments, returning its textual result
    async fn execute(&self, arguments: &Value) -> Result<String>;
}

/// Merges streamed chunks into a [`Completion`]
///
/// Tool-call fragments are keyed strictly by `index`, so interleaved and
/// gapped arrivals land in the right call. `finalize` resolves every slot
/// into a complete call: missing ids are synthesized, a missing name falls
/// back to the sole declared tool, and arguments that fail to parse are
/// repaired rather than discarded.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    content: String,
    slots: Vec<CallSlot>,
    finalized: Option<Completion>,
}

#[derive(Debug, Default)]
struct CallSlot {
    id: String,
    name: String,
    raw_arguments: String,
    structured_arguments: Option<Value>,
}

impl CallSlot {
    fn is_empty(&self) -> bool {
        self.id.is_empty()
            && self.name.is_empty()
            && self.raw_arguments.is_empty()
            && self.structured_arguments.is_none()
    }
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk into the accumulator
    pub fn push(&mut self, chunk: &StreamChunk) {
        if let Some(delta) = &chunk.content {
            self.content.push_str(delta);
        }
        for fragment in &chunk.tool_calls {
            self.push_fragment(fragment);
        }
    }

    fn push_fragment(&mut self, fragment: &ToolCallFragment) {
        if self.slots.len() <= fragment.index {
            self.slots.resize_with(fragment.index + 1, CallSlot::default);
        }
        let slot = &mut self.slots[fragment.index];
        if let Some(id) = &fragment.id {
            slot.id.push_str(id);
        }
        if let Some(name) = &fragment.name {
            slot.name.push_str(name);
        }
        match &fragment.arguments {
            Some(FragmentArguments::Raw(text)) => slot.raw_arguments.push_str(text),
            Some(FragmentArguments::Structured(value)) => {
                slot.structured_arguments = Some(value.clone())
            }
            None => {}
        }
    }

    /// Text accumulated so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Resolve the stream into a completion
    ///
    /// Idempotent: both a terminal chunk and the stream closing may trigger
    /// it, and later calls return the cached result (including any
    /// synthesized call ids).
    pub fn finalize(&mut self, tools: &[ToolSpec]) -> Completion {
        if let Some(completion) = &self.finalized {
            return completion.clone();
        }

        let tool_calls = self
            .slots
            .iter()
            .filter(|slot| !slot.is_empty())
            .map(|slot| {
                let name = if slot.name.is_empty() {
                    match tools {
                        [only] => only.name.clone(),
                        _ => String::new(),
                    }
                } else {
                    slot.name.clone()
                };
                let spec = tools.iter().find(|tool| tool.name == name);
                let id = if slot.id.is_empty() {
                    uuid::Uuid::new_v4().to_string()
                } else {
                    slot.id.clone()
                };
                ToolCall {
                    id,
                    name,
                    arguments: resolve_arguments(slot, spec),
                }
            })
            .collect();

        let completion = Completion {
            content: self.content.clone(),
            tool_calls,
        };
        self.finalized = Some(completion.clone());
        completion
    }
}

/// Turn whatever the model sent for a call into usable arguments
///
/// A structured object wins; otherwise the raw text is parsed as JSON. When
/// neither yields an object satisfying the schema, the raw text becomes the
/// value of the tool's first required field, so the call still executes with
/// the most literal reading of what the model said.
fn resolve_arguments(slot: &CallSlot, spec: Option<&ToolSpec>) -> Value {
    let parsed = match &slot.structured_arguments {
        Some(value) => Some(value.clone()),
        None if !slot.raw_arguments.trim().is_empty() => {
            serde_json::from_str(slot.raw_arguments.trim()).ok()
        }
        None => None,
    };

    match parsed {
        Some(Value::Object(mut map)) => {
            if let Some(spec) = spec {
                for field in spec.required_fields() {
                    map.entry(field).or_insert_with(|| Value::String(String::new()));
                }
            }
            Value::Object(map)
        }
        // the model sometimes wraps the sole argument in a bare JSON string
        Some(Value::String(text)) => repair_into_primary_field(spec, &text),
        _ => repair_into_primary_field(spec, slot.raw_arguments.trim()),
    }
}

fn repair_into_primary_field(spec: Option<&ToolSpec>, text: &str) -> Value {
    match spec.and_then(|s| s.primary_field()) {
        Some(field) => serde_json::json!({ field: text }),
        None => serde_json::json!({}),
    }
}
