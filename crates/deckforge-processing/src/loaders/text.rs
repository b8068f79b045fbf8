//! Plain text, web page, and PDF parsers

use std::path::Path;

use anyhow::{Context, Result};
use scraper::{Html, Node};

use super::ParsedSection;

const HIDDEN_ELEMENTS: [&str; 6] = ["script", "style", "noscript", "template", "head", "svg"];

pub fn parse_text(path: &Path) -> Result<Vec<ParsedSection>> {
    let bytes = std::fs::read(path).context("Failed to read text file")?;
    Ok(vec![ParsedSection {
        label: None,
        text: String::from_utf8_lossy(&bytes).into_owned(),
    }])
}

pub fn parse_html(path: &Path) -> Result<Vec<ParsedSection>> {
    let bytes = std::fs::read(path).context("Failed to read web page")?;
    let page = String::from_utf8_lossy(&bytes);
    let (title, text) = html_text(&page);
    Ok(vec![ParsedSection { label: title, text }])
}

pub fn parse_pdf(path: &Path) -> Result<Vec<ParsedSection>> {
    let text = pdf_extract::extract_text(path).context("Failed to extract PDF text")?;
    tracing::debug!(text_len = text.len(), "PDF text extracted");
    Ok(vec![ParsedSection { label: None, text }])
}

/// Cheap sniff for bodies served without an HTML content type.
pub fn looks_like_html(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let head = head.trim_start();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<body")
}

/// Page title and visible text, one line per text node.
fn html_text(page: &str) -> (Option<String>, String) {
    let document = Html::parse_document(page);

    let mut title = None;
    let mut lines: Vec<String> = Vec::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden_in = node.ancestors().find_map(|a| match a.value() {
            Node::Element(el) if HIDDEN_ELEMENTS.contains(&el.name()) || el.name() == "title" => {
                Some(el.name().to_string())
            }
            _ => None,
        });
        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }
        match hidden_in.as_deref() {
            Some("title") => {
                if title.is_none() {
                    title = Some(line);
                }
            }
            Some(_) => {}
            None => lines.push(line),
        }
    }

    (title, lines.join("\n"))
}
