//! Document loaders
//!
//! Every text-bearing file type maps to one row of [`LOADERS`]: how the bytes
//! are acquired and which parser reads them. Loading always goes
//! fetch → temporary file → parse → split.

mod office;
mod tabular;
mod text;

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::{anyhow, Result};
use deckforge_core::models::{Chunk, DocumentMetadata, LoadedDocument};
use deckforge_core::{Config, DocumentError, FileType};

use crate::drive::{DriveClient, ExportFormat};
use crate::fetch::{Downloader, Fetched};
use crate::splitter::TextSplitter;
use crate::temp::SourceFile;

pub use office::{docx_sections, pptx_sections};
pub use text::looks_like_html;

/// Where a loader gets its bytes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// Plain HTTP GET of the file URL
    Download,
    /// HTTP GET of a web page
    WebPage,
    /// Export of a native Google file in an Office format
    DriveExport(ExportFormat),
    /// Direct Google Drive file download
    DriveDownload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parser {
    Pdf,
    Csv,
    Text,
    Html,
    Pptx,
    Docx,
    Spreadsheet,
    Xml,
}

/// Text of one parsed unit (page, slide, sheet, row) of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSection {
    pub label: Option<String>,
    pub text: String,
}

impl Parser {
    /// Parse the file at `path`. A panic inside a format library is returned as an error.
    pub fn parse(&self, path: &Path) -> Result<Vec<ParsedSection>> {
        catch_parser_panic(|| self.parse_unguarded(path))
    }

    fn parse_unguarded(&self, path: &Path) -> Result<Vec<ParsedSection>> {
        match self {
            Parser::Pdf => text::parse_pdf(path),
            Parser::Csv => tabular::parse_csv(path),
            Parser::Text => text::parse_text(path),
            Parser::Html => text::parse_html(path),
            Parser::Pptx => office::parse_pptx(path),
            Parser::Docx => office::parse_docx(path),
            Parser::Spreadsheet => tabular::parse_spreadsheet(path),
            Parser::Xml => tabular::parse_xml(path),
        }
    }
}

// pdf-extract panics on some malformed files instead of returning an error
fn catch_parser_panic<T>(parse: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(parse)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown cause".to_string());
            Err(anyhow!("Parser panicked: {}", message))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSpec {
    pub file_type: FileType,
    pub acquisition: Acquisition,
    pub parser: Parser,
}

const LOADERS: [LoaderSpec; 14] = [
    entry(FileType::Pdf, Acquisition::Download, Parser::Pdf),
    entry(FileType::Csv, Acquisition::Download, Parser::Csv),
    entry(FileType::Txt, Acquisition::Download, Parser::Text),
    entry(FileType::Md, Acquisition::Download, Parser::Text),
    entry(FileType::Url, Acquisition::WebPage, Parser::Html),
    entry(FileType::Pptx, Acquisition::Download, Parser::Pptx),
    entry(FileType::Docx, Acquisition::Download, Parser::Docx),
    entry(FileType::Xls, Acquisition::Download, Parser::Spreadsheet),
    entry(FileType::Xlsx, Acquisition::Download, Parser::Spreadsheet),
    entry(FileType::Xml, Acquisition::Download, Parser::Xml),
    entry(
        FileType::Gdoc,
        Acquisition::DriveExport(ExportFormat::Docx),
        Parser::Docx,
    ),
    entry(
        FileType::Gsheet,
        Acquisition::DriveExport(ExportFormat::Xlsx),
        Parser::Spreadsheet,
    ),
    entry(
        FileType::Gslide,
        Acquisition::DriveExport(ExportFormat::Pptx),
        Parser::Pptx,
    ),
    entry(FileType::Gpdf, Acquisition::DriveDownload, Parser::Pdf),
];

const fn entry(file_type: FileType, acquisition: Acquisition, parser: Parser) -> LoaderSpec {
    LoaderSpec {
        file_type,
        acquisition,
        parser,
    }
}

pub struct LoaderRegistry;

impl LoaderRegistry {
    /// The loader for a file type; `None` for images and videos, which are not documents.
    pub fn resolve(file_type: FileType) -> Option<LoaderSpec> {
        LOADERS.iter().copied().find(|l| l.file_type == file_type)
    }

    pub fn all() -> &'static [LoaderSpec] {
        &LOADERS
    }
}

#[derive(Clone)]
pub struct DocumentLoader {
    downloader: Downloader,
    drive: DriveClient,
    splitter: TextSplitter,
}

impl DocumentLoader {
    pub fn new(downloader: Downloader, drive: DriveClient, splitter: TextSplitter) -> Self {
        Self {
            downloader,
            drive,
            splitter,
        }
    }

    pub fn from_config(config: &Config, downloader: Downloader) -> Self {
        Self::new(
            downloader.clone(),
            DriveClient::new(downloader),
            TextSplitter::from_config(config),
        )
    }

    /// Load and chunk the document at `url`.
    ///
    /// A source that parses but holds no text yields a document with no chunks.
    pub async fn load(&self, url: &str, file_type: FileType) -> Result<LoadedDocument, DocumentError> {
        let spec = LoaderRegistry::resolve(file_type)
            .ok_or_else(|| DocumentError::file("Unsupported file type", url))?;

        let fetched = self.acquire(url, spec.acquisition).await.map_err(|e| {
            tracing::warn!(url = %url, file_type = %file_type, error = %e, "Source download failed");
            DocumentError::file(format!("Failed to download file: {:#}", e), url)
        })?;

        let parser = match spec.parser {
            Parser::Html if !fetched.is_html() && !looks_like_html(&fetched.bytes) => Parser::Text,
            parser => parser,
        };

        let source = SourceFile::spool(&fetched.bytes, file_type.extension())
            .map_err(|e| DocumentError::file(format!("No file found: {:#}", e), url))?;
        let source_id = source.display_path();

        // The temp file moves into the task and is removed when it finishes
        let parsed = tokio::task::spawn_blocking(move || {
            let result = parser.parse(source.path());
            drop(source);
            result
        })
        .await
        .map_err(|e| DocumentError::file(format!("Parser task failed: {}", e), &source_id))?
        .map_err(|e| {
            tracing::warn!(url = %url, file_type = %file_type, error = %e, "Source parsing failed");
            DocumentError::file(format!("No file content available: {:#}", e), &source_id)
        })?;

        let document = self.chunk(url, file_type, parsed);
        tracing::info!(
            file_type = %file_type,
            chunks = document.chunks.len(),
            "Documents loaded successfully"
        );
        Ok(document)
    }

    async fn acquire(&self, url: &str, acquisition: Acquisition) -> Result<Fetched> {
        match acquisition {
            Acquisition::Download | Acquisition::WebPage => self.downloader.fetch(url).await,
            Acquisition::DriveExport(format) => self.drive.export(url, format).await,
            Acquisition::DriveDownload => self.drive.download(url).await,
        }
    }

    /// Split every parsed section and number the chunks in order.
    pub fn chunk(
        &self,
        source_id: &str,
        file_type: FileType,
        sections: Vec<ParsedSection>,
    ) -> LoadedDocument {
        let mut metadata = DocumentMetadata::new(file_type);
        let mut chunks = Vec::new();
        for section in sections {
            if let Some(label) = section.label {
                if file_type == FileType::Url && metadata.title.is_none() {
                    metadata.title = Some(label.clone());
                }
                metadata.sections.push(label);
            }
            for text in self.splitter.split_text(&section.text) {
                chunks.push(Chunk {
                    index: chunks.len(),
                    text,
                });
            }
        }

        LoadedDocument {
            source_id: source_id.to_string(),
            metadata,
            chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn loader(server: &mockito::ServerGuard, chunk_size: usize) -> DocumentLoader {
        let downloader = Downloader::new(Duration::from_secs(5), 1024 * 1024, true).unwrap();
        DocumentLoader::new(
            downloader.clone(),
            DriveClient::with_bases(downloader, server.url(), server.url(), server.url()),
            TextSplitter::new(chunk_size, 0),
        )
    }

    #[test]
    fn test_every_document_type_has_exactly_one_loader() {
        for ft in FileType::ALL {
            let matches = LoaderRegistry::all()
                .iter()
                .filter(|l| l.file_type == ft)
                .count();
            match ft {
                FileType::Img | FileType::YoutubeUrl => assert_eq!(matches, 0, "{}", ft),
                _ => assert_eq!(matches, 1, "{}", ft),
            }
        }
        assert!(LoaderRegistry::resolve(FileType::Img).is_none());
    }

    #[test]
    fn test_google_types_use_drive_acquisition() {
        assert_eq!(
            LoaderRegistry::resolve(FileType::Gsheet).unwrap().acquisition,
            Acquisition::DriveExport(ExportFormat::Xlsx)
        );
        assert_eq!(
            LoaderRegistry::resolve(FileType::Gpdf).unwrap(),
            entry(FileType::Gpdf, Acquisition::DriveDownload, Parser::Pdf)
        );
    }

    #[tokio::test]
    async fn test_load_text_file_is_chunked() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/notes.md")
            .with_status(200)
            .with_body("# Notes\n\nFirst paragraph.\n\nSecond paragraph.")
            .create_async()
            .await;

        let doc = loader(&server, 20)
            .load(&format!("{}/notes.md", server.url()), FileType::Md)
            .await
            .unwrap();

        assert_eq!(doc.metadata.format, FileType::Md);
        assert_eq!(doc.chunks.len(), 3);
        assert_eq!(doc.chunks[2].index, 2);
        assert_eq!(doc.joined_text(), "# Notes First paragraph. Second paragraph.");
    }

    #[tokio::test]
    async fn test_load_csv_chunks_each_row() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/scores.csv")
            .with_status(200)
            .with_body("team,points\nred,3\nblue,5\n")
            .create_async()
            .await;

        let doc = loader(&server, 1000)
            .load(&format!("{}/scores.csv", server.url()), FileType::Csv)
            .await
            .unwrap();

        assert_eq!(doc.metadata.sections, vec!["row 0", "row 1"]);
        assert_eq!(doc.joined_text(), "team: red\npoints: 3 team: blue\npoints: 5");
    }

    #[tokio::test]
    async fn test_load_pptx_from_google_slides_export() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/presentation/d/deck1/export")
            .match_query(mockito::Matcher::UrlEncoded("format".into(), "pptx".into()))
            .with_status(200)
            .with_body(office::fixtures::pptx_bytes())
            .create_async()
            .await;

        let doc = loader(&server, 1000)
            .load(
                "https://docs.google.com/presentation/d/deck1/edit",
                FileType::Gslide,
            )
            .await
            .unwrap();

        assert!(doc.joined_text().starts_with("First slide"));
        assert_eq!(doc.metadata.sections, vec!["slide 1", "slide 2"]);
    }

    #[tokio::test]
    async fn test_web_page_served_as_text_is_read_as_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/readme")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("Read <b>me</b>")
            .create_async()
            .await;

        let doc = loader(&server, 1000)
            .load(&format!("{}/readme", server.url()), FileType::Url)
            .await
            .unwrap();
        assert_eq!(doc.joined_text(), "Read <b>me</b>");
    }

    #[tokio::test]
    async fn test_web_page_title_is_recorded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/post")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><head><title>Post</title></head><body><p>Body text</p></body></html>")
            .create_async()
            .await;

        let doc = loader(&server, 1000)
            .load(&format!("{}/post", server.url()), FileType::Url)
            .await
            .unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Post"));
        assert_eq!(doc.joined_text(), "Body text");
    }

    #[tokio::test]
    async fn test_download_failure_is_file_handler_error_with_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone.pdf")
            .with_status(404)
            .create_async()
            .await;
        let url = format!("{}/gone.pdf", server.url());

        let err = loader(&server, 1000)
            .load(&url, FileType::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::FileHandler { .. }));
        assert_eq!(err.source_id(), url);
    }

    #[tokio::test]
    async fn test_parse_failure_reports_temp_path_and_removes_it() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/broken.docx")
            .with_status(200)
            .with_body("definitely not a zip")
            .create_async()
            .await;

        let err = loader(&server, 1000)
            .load(&format!("{}/broken.docx", server.url()), FileType::Docx)
            .await
            .unwrap_err();

        assert!(err.reason().starts_with("No file content available"));
        assert!(err.source_id().ends_with(".docx"));
        assert!(!Path::new(err.source_id()).exists());
    }

    #[test]
    fn test_parser_panic_becomes_error() {
        let err = catch_parser_panic::<()>(|| panic!("Font")).unwrap_err();
        assert_eq!(err.to_string(), "Parser panicked: Font");

        let owned = catch_parser_panic::<()>(|| panic!("{} missing", "MediaBox")).unwrap_err();
        assert_eq!(owned.to_string(), "Parser panicked: MediaBox missing");
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_file_handler_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/garbled.pdf")
            .with_status(200)
            .with_body(fixtures::pdf_with_undeclared_font())
            .create_async()
            .await;
        server
            .mock("GET", "/truncated.pdf")
            .with_status(200)
            .with_body("%PDF-1.4\n1 0 obj\n<< /Type /Catalog")
            .create_async()
            .await;

        let loader = loader(&server, 1000);
        for name in ["garbled.pdf", "truncated.pdf"] {
            let err = loader
                .load(&format!("{}/{}", server.url(), name), FileType::Pdf)
                .await
                .unwrap_err();
            assert!(matches!(err, DocumentError::FileHandler { .. }), "{}", name);
            assert!(err.reason().starts_with("No file content available"), "{}", name);
            assert!(!Path::new(err.source_id()).exists());
        }
    }

    #[tokio::test]
    async fn test_empty_source_yields_no_chunks() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/empty.txt")
            .with_status(200)
            .with_body("   \n\n ")
            .create_async()
            .await;

        let doc = loader(&server, 1000)
            .load(&format!("{}/empty.txt", server.url()), FileType::Txt)
            .await
            .unwrap();
        assert!(doc.is_empty());
    }

    #[tokio::test]
    async fn test_image_type_is_not_a_document() {
        let server = mockito::Server::new_async().await;
        let err = loader(&server, 1000)
            .load("https://example.com/cat.png", FileType::Img)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "Unsupported file type");
    }

    mod fixtures {
        /// A one-page PDF whose content stream selects a font the page never declares.
        pub fn pdf_with_undeclared_font() -> Vec<u8> {
            let content = "BT /F1 12 Tf 72 712 Td (Quarterly numbers) Tj ET";
            let objects = [
                "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
                "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << >> /Contents 4 0 R >>"
                    .to_string(),
                format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
            ];

            let mut pdf = b"%PDF-1.4\n".to_vec();
            let mut offsets = Vec::new();
            for (i, body) in objects.iter().enumerate() {
                offsets.push(pdf.len());
                pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
            }
            let xref_at = pdf.len();
            pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
            for offset in offsets {
                pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
            }
            pdf.extend_from_slice(
                format!(
                    "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                    objects.len() + 1,
                    xref_at
                )
                .as_bytes(),
            );
            pdf
        }
    }
}
