//! Slide deck generation from a presentation brief

use std::sync::Arc;

use anyhow::{Context, Result};
use deckforge_core::{AppError, PresentationBrief, SlideDeck};
use serde_json::{json, Value};

use crate::gemini::{GenerationRequest, LanguageModel};
use crate::prompts;

#[derive(Clone)]
pub struct SlideGenerator {
    model: Arc<dyn LanguageModel>,
}

impl SlideGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn generate(&self, brief: &PresentationBrief) -> Result<SlideDeck, AppError> {
        let n_slides = brief.n_slides().to_string();
        let prompt = prompts::GENERATE_SLIDES.render(&[
            ("topic", brief.topic()),
            ("objective", brief.objective()),
            ("target_audience", brief.target_audience()),
            ("n_slides", &n_slides),
            ("slide_breakdown", brief.slide_breakdown()),
            ("lang", brief.lang().english_name()),
            ("summary", brief.summary()),
        ])?;

        let request = GenerationRequest::text(prompt).with_response_schema(deck_response_schema());
        let answer = self
            .model
            .generate(request)
            .await
            .map_err(|e| AppError::ModelProvider(format!("{:#}", e)))?;

        let deck = parse_deck(&answer).map_err(|e| AppError::ModelProvider(format!("{:#}", e)))?;
        if deck.slides.len() != brief.n_slides() as usize {
            tracing::warn!(
                requested = brief.n_slides(),
                generated = deck.slides.len(),
                "Model returned a different number of slides than requested"
            );
        }
        tracing::info!(
            model = self.model.model_name(),
            title = %deck.title,
            slides = deck.slides.len(),
            "Slide deck generated"
        );
        Ok(deck)
    }
}

/// Response schema in the subset of OpenAPI that Gemini accepts.
pub fn deck_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING", "description": "The title of the presentation"},
            "description": {"type": "STRING", "description": "A brief description of the presentation"},
            "slides": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": {"type": "STRING", "description": "The title of the slide"},
                        "content": {"type": "STRING", "description": "The content of the slide"}
                    },
                    "required": ["title", "content"]
                }
            }
        },
        "required": ["title", "description", "slides"]
    })
}

/// Parse the model answer, tolerating a markdown code fence around the JSON.
pub fn parse_deck(answer: &str) -> Result<SlideDeck> {
    let json_str = answer
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(json_str).with_context(|| {
        let preview: String = json_str.chars().take(200).collect();
        format!("Model answer is not a valid slide deck: {}", preview)
    })
}
