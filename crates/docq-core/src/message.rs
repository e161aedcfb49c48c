//! Chat message types shared across backends, stores, and the assistant

use serde::{Deserialize, Serialize};

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A chat message, tagged by role
///
/// Assistant messages may carry tool calls alongside (or instead of) text
/// content. Tool messages carry the result of a single tool call and point
/// back at it via `tool_call_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content,
            tool_calls,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Role tag as it appears on the wire
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::Tool { .. } => "tool",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_message_serializes_tool_calls() {
        let message = Message::assistant_with_tool_calls(
            None,
            vec![ToolCall {
                id: "call-0".to_string(),
                name: "query_knowledge_base".to_string(),
                arguments: json!({"query_input": "rust async traits"}),
            }],
        );

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value.get("content").is_none());
        assert_eq!(value["tool_calls"][0]["name"], "query_knowledge_base");
        assert_eq!(
            value["tool_calls"][0]["arguments"]["query_input"],
            "rust async traits"
        );
    }

    #[test]
    fn test_message_round_trips_through_role_tag() {
        let tool = Message::tool("call-0", "SOURCE: guide");
        let encoded = serde_json::to_string(&tool).unwrap();
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.role(), "tool");
        assert_eq!(decoded, tool);
    }

    #[test]
    fn test_assistant_without_tool_calls_deserializes() {
        let decoded: Message =
            serde_json::from_str(r#"{"role":"assistant","content":"hello"}"#).unwrap();
        assert_eq!(decoded, Message::assistant("hello"));
    }

    #[test]
    fn test_role_tag_snapshot() {
        insta::assert_yaml_snapshot!(Message::user("hello"), @r###"
        ---
        role: user
        content: hello
        "###);
    }
}
