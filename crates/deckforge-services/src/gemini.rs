//! Google Gemini client
//!
//! Text and vision requests both go through `models/{model}:generateContent`.
//! Images are sent inline as base64; structured output is requested with a
//! JSON response schema.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use deckforge_core::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_ERROR_BODY_CHARS: usize = 500;

/// A hosted language model that turns a prompt (and optionally an image) into text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

/// Image bytes sent along with a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image: Option<InlineImage>,
    /// When set, the model is asked for `application/json` matching this schema
    pub response_schema: Option<Value>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_response_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

// generateContent request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for Gemini")?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.google_api_key.clone(),
            config.gemini_model.clone(),
            config.gemini_api_base.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    fn build_body(request: GenerationRequest) -> GenerateContentRequest {
        let mut parts = Vec::with_capacity(2);
        if let Some(image) = request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type,
                    data: base64::engine::general_purpose::STANDARD.encode(&image.data),
                },
            });
        }
        parts.push(Part::Text {
            text: request.prompt,
        });

        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: request.response_schema.map(|schema| GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            }),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let has_image = request.image.is_some();
        let body = Self::build_body(request);

        tracing::debug!(model = %self.model, has_image, "Sending Gemini request");
        let response = self
            .http_client
            .post(format!(
                "{}/models/{}:generateContent",
                self.api_base, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let error_text: String = error_text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(anyhow!(
                "Gemini API request failed: {} - {}",
                status,
                error_text
            ));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(anyhow!("Gemini blocked the prompt: {}", reason));
        }

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(anyhow!(
                "Gemini returned an empty answer (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ));
        }
        Ok(text)
    }
}
