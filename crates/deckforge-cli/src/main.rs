//! Deckforge CLI: generate a presentation without running the server.
//!
//! Reads the same environment as the API (`GOOGLE_API_KEY`, `RESULTS_DIR`, ...);
//! `MASTER_API_KEY` is not needed.

use anyhow::Context;
use clap::{Parser, Subcommand};
use deckforge_cli::{init_tracing, render_output, OutputFormat};
use deckforge_core::{Config, GenerateRequest, RequestSchema};
use deckforge_services::PresentationWorkflow;

#[derive(Parser)]
#[command(name = "deckforge", about = "Generate slide presentations from documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a source and generate a presentation from it
    Generate {
        /// The topic of the presentation
        #[arg(long)]
        topic: String,
        /// The objective of the presentation
        #[arg(long)]
        objective: String,
        /// The target audience
        #[arg(long)]
        audience: String,
        /// Number of content slides
        #[arg(long, default_value = "5")]
        slides: u32,
        /// What each slide should cover
        #[arg(long)]
        breakdown: String,
        /// Language code: en, es, fr, de, it, pt
        #[arg(long, default_value = "en")]
        lang: String,
        /// Source location (file URL, Drive link, web page, image, or YouTube video)
        #[arg(long)]
        file_url: String,
        /// Source type tag, e.g. pdf, docx, gsheet, url, img, youtube_url
        #[arg(long)]
        file_type: String,
        #[arg(long, value_enum, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            topic,
            objective,
            audience,
            slides,
            breakdown,
            lang,
            file_url,
            file_type,
            output,
        } => {
            let config = Config::from_env().context("Failed to load configuration")?;
            config.validate()?;
            let workflow = PresentationWorkflow::from_config(&config)?;

            let request = GenerateRequest {
                request_args: RequestSchema {
                    topic,
                    objective,
                    target_audience: audience,
                    n_slides: slides,
                    slide_breakdown: breakdown,
                    lang,
                    summary: String::new(),
                },
                file_url,
                file_type,
            };

            let result = workflow
                .run(request)
                .await
                .map_err(|e| anyhow::anyhow!(e.detailed_message()))?;
            println!("{}", render_output(&result, output)?);
        }
    }

    Ok(())
}
