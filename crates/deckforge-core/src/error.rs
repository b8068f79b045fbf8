//! Error types module
//!
//! `DocumentError` covers the ways a source can fail to become a summary; each
//! kind carries the identifier of the failing source. `AppError` adds request
//! and provider failures on top and describes its own HTTP presentation through
//! [`ErrorMetadata`].

use std::io;

/// Level at which the API logs an error before responding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Client mistakes: bad parameters, missing key
    Debug,
    /// The submitted source could not be read
    Warn,
    /// Unexpected failures on our side or upstream
    Error,
}

/// How an error presents itself over HTTP
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "FILE_HANDLER_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the same request may succeed later
    fn is_recoverable(&self) -> bool;

    /// What the caller can do about it, if anything
    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show the caller
    fn client_message(&self) -> String;

    /// Sensitive errors never expose details, even outside production
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

/// A source (file, image, or video) could not be turned into text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("{reason} (source: {source_id})")]
    FileHandler { reason: String, source_id: String },

    #[error("{reason} (source: {source_id})")]
    ImageHandler { reason: String, source_id: String },

    #[error("{reason} (source: {source_id})")]
    VideoTranscript { reason: String, source_id: String },
}

impl DocumentError {
    pub fn file(reason: impl Into<String>, source_id: impl Into<String>) -> Self {
        DocumentError::FileHandler {
            reason: reason.into(),
            source_id: source_id.into(),
        }
    }

    pub fn image(reason: impl Into<String>, source_id: impl Into<String>) -> Self {
        DocumentError::ImageHandler {
            reason: reason.into(),
            source_id: source_id.into(),
        }
    }

    pub fn video(reason: impl Into<String>, source_id: impl Into<String>) -> Self {
        DocumentError::VideoTranscript {
            reason: reason.into(),
            source_id: source_id.into(),
        }
    }

    /// Identifier (URL or temporary path) of the source that failed.
    pub fn source_id(&self) -> &str {
        match self {
            DocumentError::FileHandler { source_id, .. }
            | DocumentError::ImageHandler { source_id, .. }
            | DocumentError::VideoTranscript { source_id, .. } => source_id,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            DocumentError::FileHandler { reason, .. }
            | DocumentError::ImageHandler { reason, .. }
            | DocumentError::VideoTranscript { reason, .. } => reason,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Model provider error: {0}")]
    ModelProvider(String),

    #[error("Rendering error: {0}")]
    Rendering(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check API key"),
            false,
            LogLevel::Debug,
        ),
        AppError::Document(DocumentError::FileHandler { .. }) => (
            422,
            "FILE_HANDLER_ERROR",
            false,
            Some("Check that the file URL is reachable and matches the file type"),
            false,
            LogLevel::Warn,
        ),
        AppError::Document(DocumentError::ImageHandler { .. }) => (
            502,
            "IMAGE_HANDLER_ERROR",
            true,
            Some("Check the image URL or retry after a short delay"),
            false,
            LogLevel::Warn,
        ),
        AppError::Document(DocumentError::VideoTranscript { .. }) => (
            422,
            "VIDEO_TRANSCRIPT_ERROR",
            false,
            Some("Use a shorter video with captions available"),
            false,
            LogLevel::Warn,
        ),
        AppError::ModelProvider(_) => (
            502,
            "MODEL_PROVIDER_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Rendering(_) => (
            500,
            "RENDERING_ERROR",
            false,
            Some("Check the presentation template"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Document(DocumentError::FileHandler { .. }) => "FileHandlerError",
            AppError::Document(DocumentError::ImageHandler { .. }) => "ImageHandlerError",
            AppError::Document(DocumentError::VideoTranscript { .. }) => "VideoTranscriptError",
            AppError::ModelProvider(_) => "ModelProvider",
            AppError::Rendering(_) => "Rendering",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Full message including the source chain, for logs and non-production responses.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Document(ref err) => err.to_string(),
            AppError::ModelProvider(_) => "The language model request failed".to_string(),
            AppError::Rendering(_) => "Failed to render the presentation".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_file_handler() {
        let err = AppError::from(DocumentError::file(
            "Unsupported file type",
            "https://example.com/a.bin",
        ));
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "FILE_HANDLER_ERROR");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("Unsupported file type"));
        assert!(err.client_message().contains("https://example.com/a.bin"));
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_video_transcript() {
        let err = AppError::from(DocumentError::video(
            "Video is 900 seconds long",
            "https://youtu.be/abc",
        ));
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "VIDEO_TRANSCRIPT_ERROR");
        assert_eq!(err.error_type(), "VideoTranscriptError");
    }

    #[test]
    fn test_error_metadata_image_handler() {
        let err = AppError::from(DocumentError::image("Error processing the request", "u"));
        assert_eq!(err.http_status_code(), 502);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_metadata_model_provider_is_sensitive() {
        let err = AppError::ModelProvider("status 500: quota".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "The language model request failed");
    }

    #[test]
    fn test_document_error_accessors() {
        let err = DocumentError::file("No file content available", "/tmp/x.pdf");
        assert_eq!(err.source_id(), "/tmp/x.pdf");
        assert_eq!(err.reason(), "No file content available");
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("inner").context("outer"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error with source"));
        assert!(details.contains("outer"));
    }

    #[test]
    fn test_error_metadata_suggested_actions() {
        let err = AppError::InvalidInput("test".to_string());
        assert_eq!(
            err.suggested_action(),
            Some("Check request parameters and try again")
        );
        let err = AppError::Unauthorized("test".to_string());
        assert_eq!(err.suggested_action(), Some("Check API key"));
    }
}
