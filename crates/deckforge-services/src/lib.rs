//! Deckforge Services Layer
//!
//! Model-facing orchestration: the Gemini client behind the [`LanguageModel`]
//! trait, prompt templates, the three summarization paths, slide generation,
//! and the end-to-end [`PresentationWorkflow`] that the API and CLI call.

pub mod gemini;
pub mod prompts;
pub mod slides;
pub mod summarizer;
pub mod workflow;

pub use gemini::{GeminiClient, GenerationRequest, InlineImage, LanguageModel};
pub use slides::SlideGenerator;
pub use summarizer::Summarizer;
pub use workflow::{PresentationWorkflow, WorkflowOutput};

#[cfg(test)]
pub(crate) mod testing;
