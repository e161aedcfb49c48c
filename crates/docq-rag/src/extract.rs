//! Document text extraction
//!
//! Turns raw uploaded bytes into plain text suitable for chunking. PDF
//! parsing is CPU-bound and runs on the blocking pool; Markdown and HTML
//! are flattened to their visible text.

use std::path::Path;

use pulldown_cmark::{Event, Parser, TagEnd};
use scraper::{ElementRef, Html, Node};

use docq_core::{Error, Result};

/// Supported document formats, inferred from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Markdown,
    Html,
    Text,
}

impl DocumentKind {
    /// Infer the format from a file name; anything unrecognized is treated
    /// as plain text
    pub fn from_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            _ => Self::Text,
        }
    }
}

/// Document name stored alongside every chunk: the file name with its
/// extension stripped
pub fn doc_name_from_filename(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "document".to_string())
}

/// Extract plain text from raw document bytes
pub async fn extract_text(bytes: Vec<u8>, kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::Pdf => {
            let text =
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                    .map_err(|e| Error::DocumentParse(format!("PDF extraction task failed: {e}")))?
                    .map_err(|e| Error::DocumentParse(format!("failed to parse PDF: {e}")))?;
            Ok(text)
        }
        DocumentKind::Markdown => Ok(markdown_to_text(&String::from_utf8_lossy(&bytes))),
        DocumentKind::Html => Ok(html_to_text(&String::from_utf8_lossy(&bytes))),
        DocumentKind::Text => Ok(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::Rule => push_break(&mut out),
            Event::End(TagEnd::TableCell) => out.push(' '),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::TableRow,
            ) => push_break(&mut out),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Close the current block with a blank line, collapsing runs
fn push_break(out: &mut String) {
    if out.is_empty() {
        return;
    }
    while out.ends_with('\n') {
        out.pop();
    }
    out.push_str("\n\n");
}

// scraper's Html is not Send, so parsing stays inside this sync helper
fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();
    collect_element_text(document.root_element(), &mut raw);
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template"];

fn collect_element_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED_ELEMENTS.contains(&name) {
                continue;
            }
            collect_element_text(child_element, out);
            if is_block_element(name) {
                out.push('\n');
            }
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
}

fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "main"
            | "aside"
            | "nav"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "table"
            | "tr"
            | "blockquote"
            | "pre"
            | "br"
            | "hr"
            | "form"
            | "figure"
    )
}
