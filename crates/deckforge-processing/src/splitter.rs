//! Recursive character text splitter
//!
//! Text is split on the first separator of `["\n\n", "\n", " ", ""]` that
//! occurs in it; pieces still too long are split again with the remaining
//! separators, and short pieces are merged back up to the chunk size. Each
//! separator stays attached to the start of the piece that follows it. Lengths
//! are counted in characters and chunks are whitespace-trimmed.

use std::collections::VecDeque;

use deckforge_core::Config;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(1000, 0)
    }
}

impl TextSplitter {
    /// `chunk_size` must be non-zero and larger than `chunk_overlap`; see `Config::validate`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(self.merge(&good));
                good.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with(&piece, remaining));
            }
        }
        if !good.is_empty() {
            chunks.extend(self.merge(&good));
        }
        chunks
    }

    /// Greedily pack pieces into chunks no longer than the chunk size.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        size = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk longer than the chunk size"
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = join_trimmed(&current) {
                        docs.push(doc);
                    }
                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(first) => total -= char_len(first),
                            None => break,
                        }
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_trimmed(&current) {
            docs.push(doc);
        }
        docs
    }
}

/// Split on a literal separator, prefixing every piece after the first with it.
/// An empty separator splits into characters. Empty pieces are dropped.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(|c| c.to_string()).collect();
    }

    let mut parts = text.split(separator);
    let mut pieces = Vec::new();
    if let Some(first) = parts.next() {
        pieces.push(first.to_string());
    }
    for part in parts {
        pieces.push(format!("{}{}", separator, part));
    }
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn join_trimmed(parts: &VecDeque<&str>) -> Option<String> {
    let joined: String = parts.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TextSplitter::default();
        assert_eq!(
            splitter.split_text("  Hello world.\n"),
            vec!["Hello world.".to_string()]
        );
    }

    #[test]
    fn test_empty_and_blank_text_yield_no_chunks() {
        let splitter = TextSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn test_paragraphs_are_packed_up_to_chunk_size() {
        let splitter = TextSplitter::new(8, 0);
        let chunks = splitter.split_text("aaaa\n\nbbbb\n\ncccc");
        assert_eq!(chunks, vec!["aaaa", "bbbb", "cccc"]);

        let splitter = TextSplitter::new(10, 0);
        let chunks = splitter.split_text("aaaa\n\nbbbb\n\ncccc");
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccc"]);
    }

    #[test]
    fn test_separator_stays_with_following_piece() {
        let splitter = TextSplitter::new(12, 0);
        let chunks = splitter.split_text("one two three four");
        assert_eq!(chunks, vec!["one two", "three four"]);
    }

    #[test]
    fn test_long_word_falls_back_to_characters() {
        let splitter = TextSplitter::new(4, 0);
        let chunks = splitter.split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_no_chunk_exceeds_chunk_size() {
        let splitter = TextSplitter::new(50, 0);
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n".repeat(40)
            + &"x".repeat(130)
            + "\n\n"
            + &"sed do eiusmod tempor ".repeat(20);
        let chunks = splitter.split_text(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "chunk too long: {:?}", chunk);
        }
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        let splitter = TextSplitter::new(5, 0);
        let chunks = splitter.split_text("ééééé");
        assert_eq!(chunks, vec!["ééééé"]);
    }

    #[test]
    fn test_overlap_repeats_trailing_pieces() {
        let splitter = TextSplitter::new(10, 5);
        let chunks = splitter.split_text("aa bb cc dd ee");
        assert_eq!(chunks, vec!["aa bb cc", "cc dd ee"]);
    }

    #[test]
    fn test_default_uses_thousand_characters() {
        let splitter = TextSplitter::default();
        assert_eq!(splitter.chunk_size(), 1000);
        let text = "word ".repeat(450);
        let chunks = splitter.split_text(&text);
        assert_eq!(chunks.len(), 3);
    }
}
