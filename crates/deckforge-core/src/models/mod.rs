//! Data models for the application
//!
//! Request DTOs and their validated form, the slide deck produced by the
//! model, and the transient loaded-document shape produced by the loaders.

mod deck;
mod document;
mod request;

pub use deck::*;
pub use document::*;
pub use request::*;
