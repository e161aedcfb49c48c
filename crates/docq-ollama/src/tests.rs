//! Snapshot tests for the Ollama clients

#[cfg(test)]
mod snapshot_tests {
    use crate::OllamaConfig;
    use crate::client::to_wire_messages;
    use docq_core::{Message, ToolCall, ToolSpec};
    use insta::assert_yaml_snapshot;
    use serde_json::json;

    fn knowledge_base_spec() -> ToolSpec {
        ToolSpec {
            name: "query_knowledge_base".to_string(),
            description: "Search the document knowledge base.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query_input": { "type": "string", "description": "2-5 search terms" }
                },
                "required": ["query_input"]
            }),
        }
    }

    #[test]
    fn test_config_snapshot() {
        let config = OllamaConfig {
            host: "http://localhost:11434".to_string(),
            chat_model: "qwen3:0.6b".to_string(),
            embedding_model: "all-minilm".to_string(),
        };

        assert_yaml_snapshot!(config, @r###"
        ---
        host: "http://localhost:11434"
        chat_model: "qwen3:0.6b"
        embedding_model: all-minilm
        "###);
    }

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::new(OllamaConfig::DEFAULT_HOST);
        assert_eq!(config.host, "http://localhost:11434");
        assert_eq!(config.chat_model, OllamaConfig::DEFAULT_CHAT_MODEL);
        assert_eq!(config.embedding_model, OllamaConfig::DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_wire_messages_for_a_full_tool_round() {
        let messages = vec![
            Message::system("You answer from documents."),
            Message::user("What does the report say about batteries?"),
            Message::assistant_with_tool_calls(
                None,
                vec![ToolCall {
                    id: "call-1".to_string(),
                    name: "query_knowledge_base".to_string(),
                    arguments: json!({"query_input": "battery capacity"}),
                }],
            ),
            Message::tool("call-1", "SOURCE: report\n\"\"\"\nCapacity doubled in 2024.\n\"\"\"\n\n---"),
            Message::assistant("According to report, capacity doubled in 2024."),
        ];

        let wire = to_wire_messages(&messages, &[knowledge_base_spec()]);
        let value = serde_json::to_value(&wire).unwrap();

        assert_eq!(
            value,
            json!([
                { "role": "system", "content": "You answer from documents." },
                { "role": "user", "content": "What does the report say about batteries?" },
                {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "type": "function",
                        "function": {
                            "index": 0,
                            "name": "query_knowledge_base",
                            "arguments": { "query_input": "battery capacity" }
                        }
                    }]
                },
                {
                    "role": "tool",
                    "content": "SOURCE: report\n\"\"\"\nCapacity doubled in 2024.\n\"\"\"\n\n---",
                    "tool_name": "query_knowledge_base"
                },
                { "role": "assistant", "content": "According to report, capacity doubled in 2024." }
            ])
        );
    }

    #[test]
    fn test_tool_result_with_unknown_call_id_keys_by_sole_tool() {
        // histories reloaded from a store may predate the calls they answer
        let messages = vec![
            Message::user("and the summary?"),
            Message::tool("call-from-long-ago", "SOURCE: notes\n\"\"\"\nAll good.\n\"\"\"\n\n---"),
        ];

        let wire = to_wire_messages(&messages, &[knowledge_base_spec()]);
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value[1]["tool_name"], "query_knowledge_base");
    }

    #[test]
    fn test_assistant_string_arguments_are_parsed_for_the_wire() {
        let messages = vec![Message::assistant_with_tool_calls(
            Some("Searching...".to_string()),
            vec![ToolCall {
                id: "call-9".to_string(),
                name: "query_knowledge_base".to_string(),
                arguments: json!(r#"{"query_input": "timeline"}"#),
            }],
        )];

        let wire = to_wire_messages(&messages, &[knowledge_base_spec()]);
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            value[0]["tool_calls"][0]["function"]["arguments"],
            json!({"query_input": "timeline"})
        );
    }
}
