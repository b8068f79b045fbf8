//! End-to-end presentation generation
//!
//! `run` takes a request from validation to a saved `.pptx`.

use std::path::PathBuf;
use std::sync::Arc;

use deckforge_core::{AppError, Config, FileType, GenerateRequest, PresentationBrief, SlideDeck};
use deckforge_processing::PresentationRenderer;
use serde::Serialize;

use crate::gemini::{GeminiClient, LanguageModel};
use crate::slides::SlideGenerator;
use crate::summarizer::Summarizer;

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutput {
    pub summary: String,
    pub deck: SlideDeck,
    pub output_path: PathBuf,
}

#[derive(Clone)]
pub struct PresentationWorkflow {
    summarizer: Summarizer,
    slides: SlideGenerator,
    renderer: PresentationRenderer,
}

impl PresentationWorkflow {
    pub fn new(summarizer: Summarizer, slides: SlideGenerator, renderer: PresentationRenderer) -> Self {
        Self {
            summarizer,
            slides,
            renderer,
        }
    }

    /// Build the workflow against Gemini.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::from_config(config)?);
        Self::with_model(config, model)
    }

    pub fn with_model(config: &Config, model: Arc<dyn LanguageModel>) -> anyhow::Result<Self> {
        Ok(Self::new(
            Summarizer::from_config(config, model.clone())?,
            SlideGenerator::new(model),
            PresentationRenderer::from_config(config),
        ))
    }

    pub async fn run(&self, request: GenerateRequest) -> Result<WorkflowOutput, AppError> {
        let brief = PresentationBrief::try_from(request.request_args)?;
        let file_type = FileType::parse_for(&request.file_type, &request.file_url)?;
        tracing::info!(
            topic = brief.topic(),
            file_type = %file_type,
            n_slides = brief.n_slides(),
            lang = brief.lang().code(),
            "Generating presentation"
        );

        let summary = match self.summarizer.summarize(&request.file_url, file_type).await? {
            Some(summary) => summary,
            None => {
                tracing::warn!(file_url = %request.file_url, "No summary for source, continuing without one");
                String::new()
            }
        };
        tracing::info!(summary_chars = summary.chars().count(), "Summary ready");

        let brief = brief.with_summary(summary.clone());
        let deck = self.slides.generate(&brief).await?;

        let renderer = self.renderer.clone();
        let to_render = deck.clone();
        let output_path = tokio::task::spawn_blocking(move || renderer.render(&to_render))
            .await
            .map_err(|e| AppError::Rendering(format!("Renderer task failed: {}", e)))?
            .map_err(|e| AppError::Rendering(format!("{:#}", e)))?;
        tracing::info!(path = %output_path.display(), "Presentation generated");

        Ok(WorkflowOutput {
            summary,
            deck,
            output_path,
        })
    }
}
