//! Source summarization
//!
//! Documents, images, and videos each have their own path to a summary. All
//! three return `Ok(None)` when the source holds no text to summarize.

use std::sync::Arc;

use deckforge_core::{AppError, Config, DocumentError, FileType, SourceKind};
use deckforge_processing::{Downloader, DocumentLoader, TextSplitter, YoutubeClient};

use crate::gemini::{GenerationRequest, InlineImage, LanguageModel};
use crate::prompts::{self, PromptTemplate};

#[derive(Clone)]
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
    loader: DocumentLoader,
    downloader: Downloader,
    youtube: YoutubeClient,
    splitter: TextSplitter,
    max_video_length_secs: u64,
}

impl Summarizer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        loader: DocumentLoader,
        downloader: Downloader,
        youtube: YoutubeClient,
        splitter: TextSplitter,
        max_video_length_secs: u64,
    ) -> Self {
        Self {
            model,
            loader,
            downloader,
            youtube,
            splitter,
            max_video_length_secs,
        }
    }

    pub fn from_config(config: &Config, model: Arc<dyn LanguageModel>) -> anyhow::Result<Self> {
        let downloader = Downloader::from_config(config)?;
        Ok(Self::new(
            model,
            DocumentLoader::from_config(config, downloader.clone()),
            downloader.clone(),
            YoutubeClient::new(downloader.clone(), config.youtube_base_url.clone()),
            TextSplitter::from_config(config),
            config.max_video_length_secs,
        ))
    }

    /// Summarize the source at `url` along the path its file type selects.
    pub async fn summarize(
        &self,
        url: &str,
        file_type: FileType,
    ) -> Result<Option<String>, AppError> {
        match file_type.source_kind() {
            SourceKind::Image => self.summarize_image(url).await.map(Some),
            SourceKind::Video => self.summarize_video(url).await,
            SourceKind::Document => self.summarize_document(url, file_type).await,
        }
    }

    pub async fn summarize_document(
        &self,
        url: &str,
        file_type: FileType,
    ) -> Result<Option<String>, AppError> {
        let document = self.loader.load(url, file_type).await?;
        if document.is_empty() {
            tracing::warn!(file_type = %file_type, "Source has no text, skipping summary");
            return Ok(None);
        }

        let template = if file_type.is_tabular() {
            prompts::SUMMARIZE_TABULAR
        } else {
            prompts::SUMMARIZE_TEXT
        };
        self.complete(template, &document.joined_text()).await.map(Some)
    }

    pub async fn summarize_image(&self, url: &str) -> Result<String, AppError> {
        let image_error = |reason: String| AppError::from(DocumentError::image(reason, url));

        let fetched = self
            .downloader
            .fetch(url)
            .await
            .map_err(|e| image_error(format!("Failed to download image: {:#}", e)))?;
        if fetched.bytes.is_empty() {
            return Err(image_error("Image is empty".to_string()));
        }

        let mime_type = detect_media_type(&fetched.bytes);
        tracing::debug!(mime_type, size = fetched.bytes.len(), "Describing image");
        let request = GenerationRequest::text(prompts::DESCRIBE_IMAGE).with_image(InlineImage {
            mime_type: mime_type.to_string(),
            data: fetched.bytes,
        });

        let summary = self
            .model
            .generate(request)
            .await
            .map_err(|e| image_error(format!("Failed to describe image: {:#}", e)))?;
        tracing::info!(model = self.model.model_name(), "Image summary generated");
        Ok(summary)
    }

    /// Videos over the length limit are rejected before the transcript is fetched.
    pub async fn summarize_video(&self, url: &str) -> Result<Option<String>, AppError> {
        let video_error = |reason: String| AppError::from(DocumentError::video(reason, url));

        let info = self
            .youtube
            .video_info(url)
            .await
            .map_err(|e| video_error(format!("Failed to load video: {:#}", e)))?;
        if info.length_secs > self.max_video_length_secs {
            return Err(video_error(format!(
                "Video is {} seconds long, please provide a video less than {} seconds long",
                info.length_secs, self.max_video_length_secs
            )));
        }

        let transcript = self
            .youtube
            .transcript(&info)
            .await
            .map_err(|e| video_error(format!("Failed to load transcript: {:#}", e)))?;
        let chunks = self.splitter.split_text(&transcript);
        tracing::info!(
            video_id = %info.video_id,
            length_secs = info.length_secs,
            chunks = chunks.len(),
            "Video transcript loaded"
        );
        if chunks.is_empty() {
            tracing::warn!(video_id = %info.video_id, "Transcript is empty, skipping summary");
            return Ok(None);
        }

        self.complete(prompts::SUMMARIZE_VIDEO, &chunks.join(" "))
            .await
            .map(Some)
    }

    async fn complete(&self, template: PromptTemplate, text: &str) -> Result<String, AppError> {
        let prompt = template.render(&[("text", text)])?;
        let summary = self
            .model
            .generate(GenerationRequest::text(prompt))
            .await
            .map_err(|e| AppError::ModelProvider(format!("{:#}", e)))?;
        tracing::info!(
            prompt = template.name(),
            model = self.model.model_name(),
            "Summary generated"
        );
        Ok(summary)
    }
}

/// Detect media type from image data using magic numbers
pub fn detect_media_type(data: &[u8]) -> &'static str {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, StubModel};
    use deckforge_processing::DriveClient;

    fn summarizer(server: &mockito::ServerGuard, model: Arc<StubModel>) -> Summarizer {
        let downloader = testing::downloader();
        Summarizer::new(
            model,
            DocumentLoader::new(
                downloader.clone(),
                DriveClient::with_bases(downloader.clone(), server.url(), server.url(), server.url()),
                testing::splitter(),
            ),
            downloader.clone(),
            YoutubeClient::new(downloader, server.url()),
            testing::splitter(),
            600,
        )
    }

    #[test]
    fn test_detect_media_type() {
        assert_eq!(detect_media_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(detect_media_type(b"\x89PNG\r\n\x1a\n"), "image/png");
        assert_eq!(detect_media_type(b"GIF89a"), "image/gif");
        assert_eq!(detect_media_type(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(detect_media_type(b"??"), "image/jpeg");
    }

    #[tokio::test]
    async fn test_tabular_sources_use_the_data_prompt() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sales.csv")
            .with_status(200)
            .with_body("region,total\nnorth,10\n")
            .create_async()
            .await;
        let model = Arc::new(StubModel::answering(["Sales are led by the north."]));

        let summary = summarizer(&server, model.clone())
            .summarize(&format!("{}/sales.csv", server.url()), FileType::Csv)
            .await
            .unwrap();

        assert_eq!(summary.as_deref(), Some("Sales are led by the north."));
        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains("structured document"));
        assert!(requests[0].prompt.contains("region: north\ntotal: 10"));
    }

    #[tokio::test]
    async fn test_empty_document_skips_the_model() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/blank.txt")
            .with_status(200)
            .with_body("\n \n")
            .create_async()
            .await;
        let model = Arc::new(StubModel::default());

        let summary = summarizer(&server, model.clone())
            .summarize(&format!("{}/blank.txt", server.url()), FileType::Txt)
            .await
            .unwrap();

        assert!(summary.is_none());
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn test_image_is_sent_inline_with_fixed_instruction() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/cat.png")
            .with_status(200)
            .with_body(b"\x89PNG\r\n\x1a\nrest")
            .create_async()
            .await;
        let model = Arc::new(StubModel::answering(["A cat on a sofa."]));

        let summary = summarizer(&server, model.clone())
            .summarize(&format!("{}/cat.png", server.url()), FileType::Img)
            .await
            .unwrap();

        assert_eq!(summary.as_deref(), Some("A cat on a sofa."));
        let request = &model.requests()[0];
        assert_eq!(request.prompt, prompts::DESCRIBE_IMAGE);
        assert_eq!(request.image.as_ref().unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_image_model_failure_is_image_handler_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/cat.jpg")
            .with_status(200)
            .with_body(b"\xFF\xD8\xFFjpeg")
            .create_async()
            .await;
        let url = format!("{}/cat.jpg", server.url());

        let err = summarizer(&server, Arc::new(StubModel::failing("vision unavailable")))
            .summarize(&url, FileType::Img)
            .await
            .unwrap_err();

        match err {
            AppError::Document(DocumentError::ImageHandler { source_id, .. }) => {
                assert_eq!(source_id, url)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_long_video_is_rejected_before_transcript() {
        let mut server = mockito::Server::new_async().await;
        let caption_url = format!("{}/api/timedtext", server.url());
        server
            .mock("GET", "/watch")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(testing::watch_page(601, &caption_url))
            .create_async()
            .await;
        let transcript = server
            .mock("GET", "/api/timedtext")
            .expect(0)
            .create_async()
            .await;
        let model = Arc::new(StubModel::default());

        let err = summarizer(&server, model.clone())
            .summarize("https://youtu.be/abc123", FileType::YoutubeUrl)
            .await
            .unwrap_err();

        transcript.assert_async().await;
        assert!(model.requests().is_empty());
        match err {
            AppError::Document(e @ DocumentError::VideoTranscript { .. }) => {
                assert_eq!(
                    e.reason(),
                    "Video is 601 seconds long, please provide a video less than 600 seconds long"
                );
                assert_eq!(e.source_id(), "https://youtu.be/abc123");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_video_transcript_is_summarized() {
        let mut server = mockito::Server::new_async().await;
        let caption_url = format!("{}/api/timedtext", server.url());
        server
            .mock("GET", "/watch")
            .match_query(mockito::Matcher::UrlEncoded("v".into(), "abc123".into()))
            .with_status(200)
            .with_body(testing::watch_page(120, &caption_url))
            .create_async()
            .await;
        server
            .mock("GET", "/api/timedtext")
            .with_status(200)
            .with_body(r#"<transcript><text start="0" dur="1">Futures are lazy.</text><text start="1" dur="1">Runtimes poll them.</text></transcript>"#)
            .create_async()
            .await;
        let model = Arc::new(StubModel::answering(["Futures need a runtime."]));

        let summary = summarizer(&server, model.clone())
            .summarize("https://www.youtube.com/watch?v=abc123", FileType::YoutubeUrl)
            .await
            .unwrap();

        assert_eq!(summary.as_deref(), Some("Futures need a runtime."));
        assert!(model.requests()[0]
            .prompt
            .contains("Futures are lazy. Runtimes poll them."));
    }

    #[tokio::test]
    async fn test_model_failure_on_document_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/notes.md")
            .with_status(200)
            .with_body("# Notes")
            .create_async()
            .await;

        let err = summarizer(&server, Arc::new(StubModel::failing("boom")))
            .summarize(&format!("{}/notes.md", server.url()), FileType::Md)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ModelProvider(_)));
    }
}
