//! Deckforge Core Library
//!
//! This crate provides the domain models, error types, file-type table, and
//! configuration shared by the processing, services, API, and CLI crates.

pub mod config;
pub mod error;
pub mod file_type;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, DocumentError, ErrorMetadata, LogLevel};
pub use file_type::{FileType, SourceKind};
pub use models::{
    Chunk, DocumentMetadata, GenerateRequest, Language, LoadedDocument, PresentationBrief,
    RequestSchema, Slide, SlideDeck,
};
