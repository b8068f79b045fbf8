use serde::{Deserialize, Serialize};

use crate::file_type::FileType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub format: FileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Video length, when the source is a video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    /// Page, slide, sheet, or row labels of the parsed parts, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<String>,
}

impl DocumentMetadata {
    pub fn new(format: FileType) -> Self {
        DocumentMetadata {
            format,
            title: None,
            duration_secs: None,
            sections: Vec::new(),
        }
    }
}

/// Text extracted from one source, split into chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub source_id: String,
    pub metadata: DocumentMetadata,
    pub chunks: Vec<Chunk>,
}

impl LoadedDocument {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk texts joined with single spaces.
    pub fn joined_text(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_text_uses_single_spaces() {
        let doc = LoadedDocument {
            source_id: "https://example.com/a.txt".to_string(),
            metadata: DocumentMetadata::new(FileType::Txt),
            chunks: vec![
                Chunk {
                    text: "first".to_string(),
                    index: 0,
                },
                Chunk {
                    text: "second".to_string(),
                    index: 1,
                },
            ],
        };
        assert_eq!(doc.joined_text(), "first second");
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_empty_document() {
        let doc = LoadedDocument {
            source_id: "x".to_string(),
            metadata: DocumentMetadata::new(FileType::Pdf),
            chunks: vec![],
        };
        assert!(doc.is_empty());
        assert_eq!(doc.joined_text(), "");
    }
}
