use anyhow::{Context, Result};
use clap::ValueEnum;
use deckforge_services::WorkflowOutput;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON document with the summary, the deck, and the saved file path
    Json,
    /// The summary as text, followed by the deck JSON
    Pretty,
}

/// Serialize with a four-space indent.
pub fn to_json_indent4(value: &impl Serialize) -> Result<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .context("Failed to serialize output")?;
    String::from_utf8(out).context("Serialized output is not UTF-8")
}

pub fn render_output(output: &WorkflowOutput, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json_indent4(output),
        OutputFormat::Pretty => {
            let summary = if output.summary.is_empty() {
                "(no summary)"
            } else {
                output.summary.as_str()
            };
            Ok(format!(
                "Summary:\n{}\n\nSlides:\n{}\n\nSaved to {}",
                summary,
                to_json_indent4(&output.deck)?,
                output.output_path.display()
            ))
        }
    }
}

/// Initialize tracing for the CLI.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
