//! Ollama chat client with streaming and tool-calling support

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use docq_core::{
    ChatBackend, ChatStream, Error, FragmentArguments, Message, Result, StreamChunk,
    ToolCallFragment, ToolSpec,
};

use crate::config::OllamaConfig;

/// Streaming chat client for an Ollama server
pub struct OllamaChat {
    config: OllamaConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    tools: Vec<WireTool>,
    stream: bool,
}

/// A message in Ollama's wire shape
///
/// Tool results are keyed by `tool_name` rather than by call id, so the
/// translation recovers the name from the assistant message that issued the
/// call.
#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireToolCall {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall {
    index: usize,
    name: String,
    arguments: Value,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolFunction,
}

#[derive(Serialize)]
struct WireToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

/// One NDJSON line of a streaming `/api/chat` response
#[derive(Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<LineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct LineMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<LineToolCall>,
}

#[derive(Deserialize)]
struct LineToolCall {
    #[serde(default)]
    id: Option<String>,
    function: LineFunction,
}

#[derive(Deserialize)]
struct LineFunction {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

impl OllamaChat {
    /// Create a new chat client from configuration
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::ChatBackend(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new chat client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env())
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.chat_model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.config.chat_model
    }
}

#[async_trait]
impl ChatBackend for OllamaChat {
    async fn stream_chat(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<ChatStream> {
        let request = ChatRequest {
            model: self.config.chat_model.clone(),
            messages: to_wire_messages(messages, tools),
            tools: tools.iter().map(wire_tool).collect(),
            stream: true,
        };

        let url = format!("{}/api/chat", self.config.host);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::ChatBackend(format!("failed to reach Ollama at {url} (is it running?): {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::ChatBackend(format!(
                "Ollama chat request failed with status {status}: {error_text}"
            )));
        }

        // NDJSON: buffer bytes until complete lines arrive, then emit one
        // normalized chunk per parsed line.
        let mut buffer = String::new();
        let mut next_index = 0usize;
        let stream = response.bytes_stream().flat_map(move |result| {
            let items: Vec<Result<StreamChunk>> = match result {
                Ok(bytes) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    drain_lines(&mut buffer)
                        .into_iter()
                        .filter_map(|line| parse_line(&line, &mut next_index))
                        .collect()
                }
                Err(e) => vec![Err(Error::ChatBackend(format!("Ollama stream failed: {e}")))],
            };
            futures::stream::iter(items)
        });

        Ok(Box::pin(stream))
    }
}

/// Translate the role-polymorphic history into Ollama's message shape
///
/// This is the single place backend-specific message translation happens. A
/// call-id-to-name map is built while walking assistant messages so that tool
/// results can be keyed by name; ids with no matching call fall back to the
/// sole declared tool.
pub(crate) fn to_wire_messages(messages: &[Message], tools: &[ToolSpec]) -> Vec<WireMessage> {
    let fallback_name = match tools {
        [only] => Some(only.name.as_str()),
        _ => None,
    };
    let mut call_names: HashMap<String, String> = HashMap::new();
    let mut wire = Vec::with_capacity(messages.len());

    for message in messages {
        match message {
            Message::System { content } => wire.push(WireMessage::plain("system", content)),
            Message::User { content } => wire.push(WireMessage::plain("user", content)),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let calls: Vec<WireToolCall> = tool_calls
                    .iter()
                    .enumerate()
                    .map(|(index, call)| {
                        call_names.insert(call.id.clone(), call.name.clone());
                        WireToolCall {
                            kind: "function",
                            function: WireFunctionCall {
                                index,
                                name: call.name.clone(),
                                arguments: object_arguments(&call.arguments),
                            },
                        }
                    })
                    .collect();

                wire.push(WireMessage {
                    role: "assistant",
                    content: content.clone().unwrap_or_default(),
                    tool_calls: (!calls.is_empty()).then_some(calls),
                    tool_name: None,
                });
            }
            Message::Tool {
                tool_call_id,
                content,
            } => {
                let name = match call_names.get(tool_call_id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = fallback_name.unwrap_or_default().to_string();
                        eprintln!(
                            "Warning: tool result {tool_call_id} matches no tool call, keying by '{name}'"
                        );
                        name
                    }
                };
                wire.push(WireMessage {
                    role: "tool",
                    content: content.clone(),
                    tool_calls: None,
                    tool_name: Some(name),
                });
            }
        }
    }

    wire
}

impl WireMessage {
    fn plain(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: None,
            tool_name: None,
        }
    }
}

/// Ollama expects tool-call arguments as an object; string payloads are
/// parsed, anything unparseable becomes an empty object
fn object_arguments(arguments: &Value) -> Value {
    match arguments {
        Value::Object(_) => arguments.clone(),
        Value::String(text) => serde_json::from_str(text).unwrap_or_else(|_| json!({})),
        _ => json!({}),
    }
}

fn wire_tool(spec: &ToolSpec) -> WireTool {
    WireTool {
        kind: "function",
        function: WireToolFunction {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.parameters.clone(),
        },
    }
}

/// Remove and return every complete line currently in the buffer
fn drain_lines(buffer: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line_end) = buffer.find('\n') {
        let line = buffer[..line_end].trim().to_string();
        buffer.drain(..=line_end);
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// Parse one response line into a normalized chunk
///
/// Malformed lines are skipped with a warning rather than failing the stream.
/// Tool calls without an explicit index are assigned the next free slot, so
/// backends that deliver whole calls per chunk never collide.
fn parse_line(line: &str, next_index: &mut usize) -> Option<Result<StreamChunk>> {
    let parsed: ChatLine = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Warning: skipping malformed Ollama stream line: {e}");
            return None;
        }
    };

    if let Some(error) = parsed.error {
        return Some(Err(Error::ChatBackend(format!("Ollama stream error: {error}"))));
    }

    let mut chunk = StreamChunk {
        done: parsed.done,
        ..Default::default()
    };

    if let Some(message) = parsed.message {
        chunk.content = message.content.filter(|content| !content.is_empty());
        for call in message.tool_calls {
            let index = match call.function.index {
                Some(index) => {
                    *next_index = (*next_index).max(index + 1);
                    index
                }
                None => {
                    let index = *next_index;
                    *next_index += 1;
                    index
                }
            };
            let arguments = call.function.arguments.map(|value| match value {
                Value::String(raw) => FragmentArguments::Raw(raw),
                structured => FragmentArguments::Structured(structured),
            });
            chunk.tool_calls.push(ToolCallFragment {
                index,
                id: call.id,
                name: call.function.name,
                arguments,
            });
        }
    }

    Some(Ok(chunk))
}
