//! File-type tags accepted by the generator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

/// Which summarization path a file type takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Downloaded, parsed, chunked, then summarized as text
    Document,
    /// Sent as an inline image to the vision model
    Image,
    /// Transcript fetched from the video page
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Pdf,
    Csv,
    Txt,
    Md,
    Url,
    Pptx,
    Docx,
    Xls,
    Xlsx,
    Xml,
    Gdoc,
    Gsheet,
    Gslide,
    Gpdf,
    YoutubeUrl,
    Img,
}

impl FileType {
    pub const ALL: [FileType; 16] = [
        FileType::Pdf,
        FileType::Csv,
        FileType::Txt,
        FileType::Md,
        FileType::Url,
        FileType::Pptx,
        FileType::Docx,
        FileType::Xls,
        FileType::Xlsx,
        FileType::Xml,
        FileType::Gdoc,
        FileType::Gsheet,
        FileType::Gslide,
        FileType::Gpdf,
        FileType::YoutubeUrl,
        FileType::Img,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Csv => "csv",
            FileType::Txt => "txt",
            FileType::Md => "md",
            FileType::Url => "url",
            FileType::Pptx => "pptx",
            FileType::Docx => "docx",
            FileType::Xls => "xls",
            FileType::Xlsx => "xlsx",
            FileType::Xml => "xml",
            FileType::Gdoc => "gdoc",
            FileType::Gsheet => "gsheet",
            FileType::Gslide => "gslide",
            FileType::Gpdf => "gpdf",
            FileType::YoutubeUrl => "youtube_url",
            FileType::Img => "img",
        }
    }

    /// Parse a tag, reporting failures against the source being loaded.
    pub fn parse_for(tag: &str, source_id: &str) -> Result<Self, DocumentError> {
        tag.parse::<FileType>()
            .map_err(|_| DocumentError::file("Unsupported file type", source_id))
    }

    /// Tabular sources are summarized with the structured-data prompt.
    pub fn is_tabular(&self) -> bool {
        matches!(
            self,
            FileType::Csv | FileType::Xls | FileType::Xlsx | FileType::Gsheet | FileType::Xml
        )
    }

    pub fn source_kind(&self) -> SourceKind {
        match self {
            FileType::Img => SourceKind::Image,
            FileType::YoutubeUrl => SourceKind::Video,
            _ => SourceKind::Document,
        }
    }

    /// Extension used for the temporary file the parser reads.
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Pdf | FileType::Gpdf => "pdf",
            FileType::Csv => "csv",
            FileType::Txt => "txt",
            FileType::Md => "md",
            FileType::Url => "html",
            FileType::Pptx | FileType::Gslide => "pptx",
            FileType::Docx | FileType::Gdoc => "docx",
            FileType::Xls => "xls",
            FileType::Xlsx | FileType::Gsheet => "xlsx",
            FileType::Xml => "xml",
            FileType::YoutubeUrl => "xml",
            FileType::Img => "img",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFileType(pub String);

impl fmt::Display for UnknownFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown file type tag: {}", self.0)
    }
}

impl std::error::Error for UnknownFileType {}

impl FromStr for FileType {
    type Err = UnknownFileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        FileType::ALL
            .iter()
            .copied()
            .find(|ft| ft.as_str() == tag)
            .ok_or(UnknownFileType(s.to_string()))
    }
}
