use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use docq_assistant::{
    ChatEvent, ChatStore, DEFAULT_MAX_TOOL_ROUNDS, MemoryChatStore, RagAssistant, new_chat_id,
};
use docq_ollama::{OllamaChat, OllamaConfig, OllamaEmbedder};
use docq_rag::{
    DEFAULT_TOP_K, IngestConfig, IngestPipeline, KnowledgeBaseTool, QdrantConfig, QdrantIndex,
};

#[derive(Parser)]
#[command(name = "docq")]
#[command(about = "Chat with your documents using local models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Index a document (pdf, markdown, html, or plain text) into the knowledge base
    Index {
        /// Path to the document
        path: PathBuf,
    },
    /// Chat with the indexed documents (default)
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Index { path } => index(path).await,
        Command::Chat => chat().await,
    }
}

async fn index(path: PathBuf) -> Result<()> {
    let embedder = Arc::new(OllamaEmbedder::new(OllamaConfig::from_env())?);
    let vector_index = Arc::new(QdrantIndex::new(QdrantConfig::from_env())?);
    let pipeline = IngestPipeline::new(embedder, vector_index, IngestConfig::from_env())?;

    println!("{} {}", "📄 Indexing".cyan().bold(), path.display());
    let count = pipeline.ingest_file(&path).await?;
    if count == 0 {
        println!("{} The document contained no text to index", "⚠️".yellow());
    } else {
        println!("{} Indexed {} chunks", "✅".green(), count);
    }
    Ok(())
}

async fn chat() -> Result<()> {
    let ollama = OllamaConfig::from_env();
    let backend = Arc::new(OllamaChat::new(ollama.clone())?);
    let embedder = Arc::new(OllamaEmbedder::new(ollama.clone())?);
    let vector_index = Arc::new(QdrantIndex::new(QdrantConfig::from_env())?);
    let tool = Arc::new(KnowledgeBaseTool::new(
        embedder,
        vector_index,
        env_usize("VECTOR_SEARCH_TOP_K", DEFAULT_TOP_K),
    ));
    let store = Arc::new(MemoryChatStore::new());
    let assistant = Arc::new(
        RagAssistant::new(backend, Arc::clone(&store), tool)
            .with_max_tool_rounds(env_usize("MAX_TOOL_ROUNDS", DEFAULT_MAX_TOOL_ROUNDS)),
    );

    let chat_id = new_chat_id();
    store.create_chat(&chat_id).await?;

    println!(
        "{} Chatting over your documents with {}",
        "📚 DocQ".cyan().bold(),
        ollama.chat_model.bold()
    );
    println!("Ask a question, or type {} to leave.\n", "exit".green());

    loop {
        print!("{} ", "❯".cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim().to_string();
        if input.is_empty() {
            continue;
        }

        let input_lower = input.to_lowercase();
        if input_lower == "exit" || input_lower == "quit" {
            break;
        }

        // The turn runs on its own task so deltas print as they arrive.
        let (tx, mut rx) = mpsc::channel(64);
        let turn = {
            let assistant = Arc::clone(&assistant);
            let chat_id = chat_id.clone();
            tokio::spawn(async move { assistant.run_turn(&chat_id, &input, tx).await })
        };

        let mut truncated = false;
        while let Some(event) = rx.recv().await {
            match event {
                ChatEvent::Delta(delta) => {
                    print!("{delta}");
                    io::stdout().flush()?;
                }
                ChatEvent::Done { truncated: cut, .. } => truncated = cut,
            }
        }
        println!();
        if truncated {
            println!("{} Stopped at the tool round limit", "⚠️".yellow());
        }
        if let Err(e) = turn.await? {
            println!("{} {}", "❌".red(), e);
        }
        println!();
    }

    println!("{}", "👋 Goodbye!".green());
    Ok(())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
