//! Deckforge Processing Library
//!
//! Everything that touches source bytes or output files: downloads with a
//! private-address guard, temporary files, format parsers, the recursive text
//! splitter, Google Drive and YouTube acquisition, and the `.pptx` renderer.

pub mod drive;
pub mod fetch;
pub mod loaders;
pub mod ooxml;
pub mod presentation;
pub mod splitter;
pub mod temp;
pub mod url_guard;
pub mod youtube;

pub use drive::DriveClient;
pub use fetch::Downloader;
pub use loaders::{Acquisition, DocumentLoader, LoaderRegistry, LoaderSpec, Parser};
pub use presentation::{OverlayImage, PresentationRenderer};
pub use splitter::TextSplitter;
pub use temp::SourceFile;
pub use youtube::{VideoInfo, YoutubeClient};
