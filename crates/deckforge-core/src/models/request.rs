use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::AppError;

/// Presentation parameters as sent by clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct RequestSchema {
    /// The topic of the slide presentation
    #[validate(length(
        min = 1,
        max = 100,
        message = "Topic must be between 1 and 100 characters"
    ))]
    pub topic: String,
    /// The objective of the slide presentation
    #[validate(length(
        min = 1,
        max = 200,
        message = "Objective must be between 1 and 200 characters"
    ))]
    pub objective: String,
    /// The target audience of the slide presentation
    #[validate(length(
        min = 1,
        max = 100,
        message = "Target audience must be between 1 and 100 characters"
    ))]
    pub target_audience: String,
    /// The number of slides in the presentation
    #[validate(range(min = 1, max = 100, message = "n_slides must be between 1 and 100"))]
    pub n_slides: u32,
    /// A breakdown of the content for each slide
    #[validate(length(min = 1, message = "Slide breakdown cannot be empty"))]
    pub slide_breakdown: String,
    /// Two-letter language code (en, es, fr, de, it, pt)
    #[validate(custom(function = "validate_lang"))]
    pub lang: String,
    #[serde(default)]
    pub summary: String,
}

fn validate_lang(value: &str) -> Result<(), ValidationError> {
    if value.parse::<Language>().is_err() {
        let mut err = ValidationError::new("lang");
        err.message = Some("Invalid language code".into());
        return Err(err);
    }
    Ok(())
}

/// Body of `POST /generate-ppt`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub request_args: RequestSchema,
    /// Location of the source (file URL, Drive link, web page, video or image URL)
    pub file_url: String,
    /// Source tag, e.g. "pdf", "gsheet", "youtube_url", "img"
    pub file_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 2 || !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(format!("Invalid language code: {}", s));
        }
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            "fr" => Ok(Language::Fr),
            "de" => Ok(Language::De),
            "it" => Ok(Language::It),
            "pt" => Ok(Language::Pt),
            _ => Err(format!("Invalid language code: {}", s)),
        }
    }
}

/// Validated, immutable presentation parameters.
///
/// Only obtainable from a [`RequestSchema`] that passed validation. The summary
/// is attached once it has been generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationBrief {
    topic: String,
    objective: String,
    target_audience: String,
    n_slides: u32,
    slide_breakdown: String,
    lang: Language,
    summary: String,
}

impl PresentationBrief {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn target_audience(&self) -> &str {
        &self.target_audience
    }

    pub fn n_slides(&self) -> u32 {
        self.n_slides
    }

    pub fn slide_breakdown(&self) -> &str {
        &self.slide_breakdown
    }

    pub fn lang(&self) -> Language {
        self.lang
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn with_summary(self, summary: impl Into<String>) -> Self {
        PresentationBrief {
            summary: summary.into(),
            ..self
        }
    }
}

impl TryFrom<RequestSchema> for PresentationBrief {
    type Error = AppError;

    fn try_from(schema: RequestSchema) -> Result<Self, Self::Error> {
        schema.validate()?;
        let lang = schema
            .lang
            .parse::<Language>()
            .map_err(AppError::InvalidInput)?;

        Ok(PresentationBrief {
            topic: schema.topic,
            objective: schema.objective,
            target_audience: schema.target_audience,
            n_slides: schema.n_slides,
            slide_breakdown: schema.slide_breakdown,
            lang,
            summary: schema.summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_schema() -> RequestSchema {
        RequestSchema {
            topic: "Rust ownership".to_string(),
            objective: "Explain borrowing".to_string(),
            target_audience: "Backend engineers".to_string(),
            n_slides: 5,
            slide_breakdown: "Intro, rules, examples, pitfalls, recap".to_string(),
            lang: "EN".to_string(),
            summary: String::new(),
        }
    }

    #[test]
    fn test_valid_schema_becomes_brief() {
        let brief = PresentationBrief::try_from(valid_schema()).unwrap();
        assert_eq!(brief.lang(), Language::En);
        assert_eq!(brief.n_slides(), 5);
        assert_eq!(brief.summary(), "");
    }

    #[test]
    fn test_unsupported_language_is_rejected() {
        let mut schema = valid_schema();
        schema.lang = "jp".to_string();
        let err = PresentationBrief::try_from(schema).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_language_must_be_two_letters() {
        for lang in ["eng", "e", "e1", ""] {
            let mut schema = valid_schema();
            schema.lang = lang.to_string();
            assert!(schema.validate().is_err(), "lang {:?} accepted", lang);
        }
    }

    #[test]
    fn test_slide_count_bounds() {
        let mut schema = valid_schema();
        schema.n_slides = 0;
        assert!(schema.validate().is_err());
        schema.n_slides = 101;
        assert!(schema.validate().is_err());
        schema.n_slides = 100;
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_length_limits_count_characters() {
        let mut schema = valid_schema();
        schema.topic = "é".repeat(100);
        assert!(schema.validate().is_ok());
        schema.topic = "é".repeat(101);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_empty_breakdown_is_rejected() {
        let mut schema = valid_schema();
        schema.slide_breakdown = String::new();
        assert!(PresentationBrief::try_from(schema).is_err());
    }

    #[test]
    fn test_summary_defaults_to_empty() {
        let json = r#"{"topic":"t","objective":"o","target_audience":"a","n_slides":3,"slide_breakdown":"b","lang":"fr"}"#;
        let schema: RequestSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.summary, "");
    }

    #[test]
    fn test_with_summary_keeps_other_fields() {
        let brief = PresentationBrief::try_from(valid_schema())
            .unwrap()
            .with_summary("A summary");
        assert_eq!(brief.summary(), "A summary");
        assert_eq!(brief.topic(), "Rust ownership");
    }
}
