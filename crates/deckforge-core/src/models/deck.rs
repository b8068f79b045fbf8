use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Slide {
    /// The title of the slide
    pub title: String,
    /// The content of the slide
    pub content: String,
}

/// Structured presentation produced by the language model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SlideDeck {
    /// The title of the presentation
    pub title: String,
    /// A brief description of the presentation
    pub description: String,
    /// Content slides, in order
    pub slides: Vec<Slide>,
}

impl SlideDeck {
    /// Slides in the rendered file: one title slide plus the content slides.
    pub fn rendered_slide_count(&self) -> usize {
        1 + self.slides.len()
    }
}
