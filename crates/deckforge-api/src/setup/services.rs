//! Service wiring

use std::sync::Arc;

use anyhow::{Context, Result};
use deckforge_core::Config;
use deckforge_services::PresentationWorkflow;

use crate::state::AppState;

/// Build the presentation workflow against the configured model provider.
pub fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let workflow = PresentationWorkflow::from_config(config)
        .context("Failed to initialize presentation workflow")?;

    tracing::info!(
        model = %config.gemini_model,
        results_dir = %config.results_dir.display(),
        template = ?config.template_path,
        max_video_length_secs = config.max_video_length_secs,
        "Services initialized"
    );

    Ok(Arc::new(AppState::new(workflow)))
}
