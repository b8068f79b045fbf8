//! Prompt templates
//!
//! Templates use `{name}` placeholders. Unknown names (and the literal JSON
//! braces in the slide prompt) are left untouched.

use anyhow::{Context, Result};
use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    name: &'static str,
    body: &'static str,
}

pub const SUMMARIZE_TEXT: PromptTemplate = PromptTemplate {
    name: "summarize-text",
    body: include_str!("../prompts/summarize-text.txt"),
};

pub const SUMMARIZE_TABULAR: PromptTemplate = PromptTemplate {
    name: "summarize-structured-tabular-data",
    body: include_str!("../prompts/summarize-structured-tabular-data.txt"),
};

pub const SUMMARIZE_VIDEO: PromptTemplate = PromptTemplate {
    name: "summarize-youtube-video",
    body: include_str!("../prompts/summarize-youtube-video.txt"),
};

pub const GENERATE_SLIDES: PromptTemplate = PromptTemplate {
    name: "generate-slides",
    body: include_str!("../prompts/generate-slides.txt"),
};

/// Fixed instruction sent along with an image.
pub const DESCRIBE_IMAGE: &str =
    "Give me a summary of what you see in the image. It must be a detailed paragraph.";

impl PromptTemplate {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fill the template in one pass, so values are never re-expanded.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        let placeholder =
            Regex::new(r"\{([a-z_]+)\}").context("Failed to compile placeholder regex")?;
        let rendered = placeholder.replace_all(self.body, |caps: &Captures| {
            let key = &caps[1];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_known_names_once() {
        let prompt = SUMMARIZE_TEXT
            .render(&[("text", "the {text} placeholder stays literal")])
            .unwrap();
        assert!(prompt.contains("the {text} placeholder stays literal"));
        assert!(!prompt.contains("Text:\n{text}"));
    }

    #[test]
    fn test_slide_prompt_keeps_json_example() {
        let prompt = GENERATE_SLIDES
            .render(&[
                ("topic", "Rust"),
                ("objective", "Teach ownership"),
                ("target_audience", "Students"),
                ("n_slides", "3"),
                ("slide_breakdown", "Intro, borrowing, lifetimes"),
                ("lang", "Spanish"),
                ("summary", ""),
            ])
            .unwrap();
        assert!(prompt.contains("Topic: Rust"));
        assert!(prompt.contains("Write every title and every slide in Spanish."));
        assert!(prompt.contains(r#"{"title": "...", "description": "...""#));
        assert!(!prompt.contains("{n_slides}"));
    }

    #[test]
    fn test_every_template_has_a_text_slot() {
        for template in [SUMMARIZE_TEXT, SUMMARIZE_TABULAR, SUMMARIZE_VIDEO] {
            assert!(template.body.contains("{text}"), "{}", template.name());
        }
    }
}
