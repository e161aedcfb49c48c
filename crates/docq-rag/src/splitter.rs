//! Text splitters for document chunking
//!
//! Two interchangeable strategies: a character-window splitter used by the
//! ingestion pipeline, and a token-bounded recursive splitter that prefers
//! paragraph, line, and sentence boundaries.

use regex::Regex;
use tiktoken_rs::CoreBPE;

use docq_core::{Error, Result};

/// Splits text into fixed-size character windows with overlap
#[derive(Debug, Clone)]
pub struct FixedSizeSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeSplitter {
    /// Create a splitter, rejecting configurations where the window would
    /// never advance
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Walk the text in a sliding window, advancing by
    /// `chunk_size - chunk_overlap` characters each step
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            if !chunk.trim().is_empty() {
                chunks.push(chunk);
            }
            start += step;
        }

        chunks
    }
}

/// Splits text into token-bounded chunks at natural boundaries
///
/// Fragments are produced by splitting at paragraph breaks, then line
/// breaks, then sentence boundaries, then spaces, recursing to the next
/// finer separator only for fragments still over budget. Fragments are then
/// greedily merged back into chunks up to the token budget, carrying
/// trailing fragments backward as overlap.
pub struct TokenSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    bpe: CoreBPE,
    sentence_boundary: Regex,
}

const SEPARATOR_LEVELS: usize = 4;

impl TokenSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        let bpe = tiktoken_rs::o200k_base()
            .map_err(|e| Error::Configuration(format!("failed to load o200k_base tokenizer: {e}")))?;
        let sentence_boundary = Regex::new(r"[.!?]+\s+")
            .map_err(|e| Error::Configuration(format!("invalid sentence pattern: {e}")))?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
            bpe,
            sentence_boundary,
        })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let splits = self.split_recursive(text, 0);
        self.merge_splits(splits)
    }

    /// Token count of a piece of text under the fixed tokenizer
    pub fn token_size(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn split_recursive(&self, text: &str, level: usize) -> Vec<String> {
        if self.token_size(text) <= self.chunk_size || level == SEPARATOR_LEVELS {
            return vec![text.to_string()];
        }

        let mut splits = Vec::new();
        for fragment in self.split_at_level(text, level) {
            if self.token_size(&fragment) <= self.chunk_size {
                splits.push(fragment);
            } else {
                splits.extend(self.split_recursive(&fragment, level + 1));
            }
        }
        splits
    }

    fn split_at_level(&self, text: &str, level: usize) -> Vec<String> {
        match level {
            0 => split_with_separator(text, "\n\n"),
            1 => split_with_separator(text, "\n"),
            2 => self.split_sentences(text),
            _ => split_with_separator(text, " "),
        }
    }

    /// Cut after each sentence terminator, keeping the terminator and its
    /// trailing whitespace with the preceding fragment
    fn split_sentences(&self, text: &str) -> Vec<String> {
        let mut fragments = Vec::new();
        let mut last = 0;
        for boundary in self.sentence_boundary.find_iter(text) {
            fragments.push(text[last..boundary.end()].to_string());
            last = boundary.end();
        }
        if last < text.len() {
            fragments.push(text[last..].to_string());
        }
        fragments
    }

    /// Greedily merge fragments into chunks up to the token budget
    ///
    /// When a chunk closes, trailing fragments are carried backward into the
    /// next chunk as overlap, while both the overlap budget and the next
    /// chunk's budget hold.
    fn merge_splits(&self, splits: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current_chunk = String::new();
        let mut current_splits: Vec<String> = Vec::new();

        for split in splits {
            if !current_chunk.is_empty()
                && self.token_size(&format!("{current_chunk}{split}")) > self.chunk_size
            {
                let trimmed = current_chunk.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }

                let last_splits = std::mem::take(&mut current_splits);
                current_chunk.clear();
                for fragment in last_splits.iter().rev() {
                    let with_overlap = format!("{fragment}{current_chunk}");
                    if self.token_size(&with_overlap) > self.chunk_overlap
                        || self.token_size(&format!("{with_overlap}{split}")) > self.chunk_size
                    {
                        break;
                    }
                    current_chunk = with_overlap;
                    current_splits.insert(0, fragment.clone());
                }
            }

            current_chunk.push_str(&split);
            current_splits.push(split);
        }

        let trimmed = current_chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        chunks
    }
}

/// Split on a separator, keeping the separator attached to the preceding
/// fragment so that concatenating the fragments reproduces the input
fn split_with_separator(text: &str, separator: &str) -> Vec<String> {
    let parts: Vec<&str> = text.split(separator).collect();
    let last = parts.len() - 1;
    let mut fragments = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        if i < last {
            fragments.push(format!("{part}{separator}"));
        } else if !part.is_empty() {
            fragments.push((*part).to_string());
        }
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(len: usize) -> String {
        "abcdefghij".chars().cycle().take(len).collect()
    }

    #[test]
    fn test_fixed_splitter_rejects_bad_configuration() {
        assert!(FixedSizeSplitter::new(0, 0).is_err());
        assert!(FixedSizeSplitter::new(100, 100).is_err());
        assert!(FixedSizeSplitter::new(100, 200).is_err());
        assert!(FixedSizeSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_fixed_splitter_empty_and_whitespace_input() {
        let splitter = FixedSizeSplitter::new(1000, 200).unwrap();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("   \n\t  ").is_empty());
    }

    #[test]
    fn test_fixed_splitter_walks_2500_chars() {
        let splitter = FixedSizeSplitter::new(1000, 200).unwrap();
        let text = sample_text(2500);
        let chunks = splitter.split(&text);

        // window starts 0, 800, 1600, 2400
        assert_eq!(chunks.len(), 4);
        assert_eq!(
            chunks.iter().map(String::len).collect::<Vec<_>>(),
            vec![1000, 1000, 900, 100]
        );
        assert_eq!(chunks[0], text[0..1000]);
        assert_eq!(chunks[1], text[800..1800]);
        assert_eq!(chunks[2], text[1600..2500]);
        assert_eq!(chunks[3], text[2400..2500]);
    }

    #[test]
    fn test_fixed_splitter_consecutive_chunks_share_overlap() {
        let splitter = FixedSizeSplitter::new(1000, 200).unwrap();
        let text = sample_text(2500);
        let chunks = splitter.split(&text);

        for pair in chunks.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            let shared = previous.len().min(200);
            assert_eq!(previous[previous.len() - shared..], next[..shared]);
        }
    }

    #[test]
    fn test_fixed_splitter_short_text_is_one_chunk() {
        let splitter = FixedSizeSplitter::new(1000, 200).unwrap();
        assert_eq!(splitter.split("short text"), vec!["short text"]);
    }

    #[test]
    fn test_fixed_splitter_counts_characters_not_bytes() {
        let splitter = FixedSizeSplitter::new(4, 1).unwrap();
        let text: String = std::iter::repeat('é').take(10).collect();
        let chunks = splitter.split(&text);
        assert_eq!(
            chunks.iter().map(|c| c.chars().count()).collect::<Vec<_>>(),
            vec![4, 4, 4, 1]
        );
    }

    #[test]
    fn test_split_with_separator_reproduces_input() {
        let text = "one\n\ntwo\n\nthree";
        let fragments = split_with_separator(text, "\n\n");
        assert_eq!(fragments, vec!["one\n\n", "two\n\n", "three"]);
        assert_eq!(fragments.concat(), text);

        // trailing separator leaves no empty tail fragment
        let fragments = split_with_separator("one two ", " ");
        assert_eq!(fragments, vec!["one ", "two "]);
    }

    #[test]
    fn test_sentence_split_keeps_terminators() {
        let splitter = TokenSplitter::new(50, 10).unwrap();
        let text = "First one. Second one! Third one? Tail without end";
        let fragments = splitter.split_sentences(text);
        assert_eq!(
            fragments,
            vec!["First one. ", "Second one! ", "Third one? ", "Tail without end"]
        );
        assert_eq!(fragments.concat(), text);
    }

    #[test]
    fn test_token_splitter_rejects_bad_configuration() {
        assert!(TokenSplitter::new(0, 0).is_err());
        assert!(TokenSplitter::new(10, 10).is_err());
    }

    #[test]
    fn test_token_splitter_empty_and_whitespace_input() {
        let splitter = TokenSplitter::new(50, 10).unwrap();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("  \n\n \t ").is_empty());
    }

    #[test]
    fn test_token_splitter_small_text_is_one_chunk() {
        let splitter = TokenSplitter::new(50, 10).unwrap();
        assert_eq!(splitter.split("Hello world."), vec!["Hello world."]);
    }

    #[test]
    fn test_token_splitter_respects_the_budget() {
        let splitter = TokenSplitter::new(16, 0).unwrap();
        let text = (1..=40)
            .map(|i| format!("Sentence number {i} sits here."))
            .collect::<Vec<_>>()
            .join(" ");

        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.trim().is_empty());
            assert!(
                splitter.token_size(chunk) <= 16,
                "chunk exceeds budget: {chunk:?}"
            );
        }
        // nothing was dropped on the way through split and merge
        for i in 1..=40 {
            let marker = format!("number {i} ");
            assert!(
                chunks.iter().any(|c| c.contains(marker.trim_end())),
                "sentence {i} missing from output"
            );
        }
    }

    #[test]
    fn test_token_splitter_carries_trailing_overlap() {
        let splitter = TokenSplitter::new(16, 8).unwrap();
        let text = [
            "Alpha sentence sits here. ",
            "Beta sentence sits here. ",
            "Gamma sentence sits here. ",
            "Delta sentence sits here. ",
            "Epsilon sentence sits here. ",
            "Zeta sentence sits here. ",
        ]
        .concat();

        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            // the next chunk opens with the previous chunk's final sentence
            let first_sentence = &next[..next.find('.').unwrap() + 1];
            assert!(
                previous.ends_with(first_sentence),
                "no overlap between {previous:?} and {next:?}"
            );
        }
    }

    #[test]
    fn test_token_splitter_recurses_below_sentences_when_needed() {
        let splitter = TokenSplitter::new(12, 0).unwrap();
        // one long breathless run: no paragraphs, lines, or terminators
        let text = (1..=60)
            .map(|i| format!("word{i}"))
            .collect::<Vec<_>>()
            .join(" ");

        let chunks = splitter.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(splitter.token_size(chunk) <= 12);
        }
        assert!(chunks.iter().any(|c| c.contains("word1")));
        assert!(chunks.iter().any(|c| c.contains("word60")));
    }
}
