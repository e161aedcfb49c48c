//! Knowledge base retrieval tool
//!
//! The one tool advertised to the model: embed the query, search the
//! index, and hand back the passages as fenced source blocks.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use docq_core::{Embedder, Error, Result, RetrievedPassage, Tool, ToolSpec, VectorIndex};

pub const KNOWLEDGE_BASE_TOOL_NAME: &str = "query_knowledge_base";
pub const DEFAULT_TOP_K: usize = 10;

const TOOL_DESCRIPTION: &str = "Search the document knowledge base to retrieve relevant passages. \
    ALWAYS use this tool when the user asks ANY question about document content, facts, \
    summaries, or information from indexed documents. Extract 2-5 key search terms from the \
    user's question and use them as query_input.";

const QUERY_INPUT_DESCRIPTION: &str = "A clear, concise search query extracted from the user's \
    question. Use 2-5 key words or a short phrase. Do NOT include question words like \"what\", \
    \"how\", \"why\" - just the search terms.";

/// Retrieves passages for a search query and formats them for the model
pub struct KnowledgeBaseTool<E, V> {
    embedder: Arc<E>,
    index: Arc<V>,
    top_k: usize,
}

impl<E: Embedder, V: VectorIndex> KnowledgeBaseTool<E, V> {
    pub fn new(embedder: Arc<E>, index: Arc<V>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }
}

#[async_trait]
impl<E: Embedder, V: VectorIndex> Tool for KnowledgeBaseTool<E, V> {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: KNOWLEDGE_BASE_TOOL_NAME.to_string(),
            description: TOOL_DESCRIPTION.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query_input": {
                        "type": "string",
                        "description": QUERY_INPUT_DESCRIPTION,
                    }
                },
                "required": ["query_input"],
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<String> {
        let query = arguments
            .get("query_input")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| {
                Error::InvalidInput(
                    "query_knowledge_base requires a non-empty query_input string".to_string(),
                )
            })?;

        let vector = self.embedder.embed_one(query).await?;
        let passages = self.index.search(vector, self.top_k).await?;
        Ok(format_sources(&passages))
    }
}

/// Render passages as `SOURCE:` blocks with triple-quoted text, the shape
/// the system prompts describe to the model
pub fn format_sources(passages: &[RetrievedPassage]) -> String {
    let blocks: Vec<String> = passages
        .iter()
        .map(|p| format!("SOURCE: {}\n\"\"\"\n{}\n\"\"\"", p.doc_name, p.text))
        .collect();
    format!("{}\n\n---", blocks.join("\n\n---\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use docq_core::Chunk;

    struct StubEmbedder {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
            self.queries.lock().unwrap().push(text.to_string());
            Ok(vec![0.25, 0.5])
        }

        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.25, 0.5]).collect())
        }
    }

    struct RecordingIndex {
        searches: Mutex<Vec<(Vec<f32>, usize)>>,
        passages: Vec<RetrievedPassage>,
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn ensure_collection(&self) -> Result<()> {
            Ok(())
        }

        async fn upsert(&self, _chunks: &[Chunk]) -> Result<()> {
            Ok(())
        }

        async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<RetrievedPassage>> {
            self.searches.lock().unwrap().push((vector, top_k));
            Ok(self.passages.clone())
        }
    }

    fn passage(doc_name: &str, text: &str) -> RetrievedPassage {
        RetrievedPassage {
            score: 0.9,
            chunk_id: "ab12cd34:0001".to_string(),
            text: text.to_string(),
            doc_name: doc_name.to_string(),
        }
    }

    fn tool_with_passages(
        passages: Vec<RetrievedPassage>,
    ) -> KnowledgeBaseTool<StubEmbedder, RecordingIndex> {
        KnowledgeBaseTool::new(
            Arc::new(StubEmbedder {
                queries: Mutex::new(Vec::new()),
            }),
            Arc::new(RecordingIndex {
                searches: Mutex::new(Vec::new()),
                passages,
            }),
            10,
        )
    }

    #[test]
    fn test_spec_declares_one_required_field() {
        let tool = tool_with_passages(Vec::new());
        let spec = tool.spec();
        assert_eq!(spec.name, "query_knowledge_base");
        assert_eq!(spec.required_fields(), vec!["query_input"]);
        assert_eq!(spec.primary_field(), Some("query_input"));
        assert_eq!(
            spec.parameters["properties"]["query_input"]["type"],
            "string"
        );
    }

    #[test]
    fn test_sources_are_fenced_and_joined() {
        let formatted = format_sources(&[
            passage("guide", "first passage"),
            passage("notes", "second passage"),
        ]);
        assert_eq!(
            formatted,
            "SOURCE: guide\n\"\"\"\nfirst passage\n\"\"\"\n\n---\n\nSOURCE: notes\n\"\"\"\nsecond passage\n\"\"\"\n\n---"
        );
    }

    #[test]
    fn test_no_sources_is_just_the_marker() {
        assert_eq!(format_sources(&[]), "\n\n---");
    }

    #[tokio::test]
    async fn test_execute_embeds_query_and_searches() {
        let tool = tool_with_passages(vec![passage("guide", "relevant text")]);
        let result = tool
            .execute(&json!({ "query_input": "  machine learning  " }))
            .await
            .unwrap();

        assert_eq!(
            tool.embedder.queries.lock().unwrap().as_slice(),
            ["machine learning"]
        );
        assert_eq!(
            tool.index.searches.lock().unwrap().as_slice(),
            [(vec![0.25, 0.5], 10)]
        );
        assert!(result.starts_with("SOURCE: guide\n"));
        assert!(result.contains("relevant text"));
    }

    #[tokio::test]
    async fn test_execute_rejects_missing_or_blank_query() {
        let tool = tool_with_passages(Vec::new());
        assert!(tool.execute(&json!({})).await.is_err());
        assert!(tool.execute(&json!({ "query_input": "   " })).await.is_err());
        assert!(tool.execute(&json!({ "query_input": 7 })).await.is_err());
        assert!(tool.index.searches.lock().unwrap().is_empty());
    }
}
