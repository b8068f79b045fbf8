//! Deckforge API Library
//!
//! This crate provides the HTTP handlers, authentication middleware, and
//! application setup for the presentation generation service.

// Module declarations
mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
