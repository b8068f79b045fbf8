//! Text extraction from `.pptx` and `.docx` packages

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::ParsedSection;
use crate::ooxml::{resolve_path, OoxmlPackage, REL_SLIDE};

pub fn parse_pptx(path: &Path) -> Result<Vec<ParsedSection>> {
    let bytes = std::fs::read(path).context("Failed to read presentation")?;
    pptx_sections(&bytes)
}

pub fn parse_docx(path: &Path) -> Result<Vec<ParsedSection>> {
    let bytes = std::fs::read(path).context("Failed to read document")?;
    docx_sections(&bytes)
}

/// One section per slide, in presentation order.
pub fn pptx_sections(bytes: &[u8]) -> Result<Vec<ParsedSection>> {
    let package = OoxmlPackage::from_bytes(bytes)?;
    let mut slide_parts = ordered_slide_parts(&package)?;

    // Packages without a readable slide list fall back to numeric part order
    if slide_parts.is_empty() {
        slide_parts = package
            .part_names()
            .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
            .map(String::from)
            .collect();
        slide_parts.sort_by_key(|n| slide_number(n));
    }

    let mut sections = Vec::with_capacity(slide_parts.len());
    for (i, part) in slide_parts.iter().enumerate() {
        let xml = package.read_xml(part)?;
        let text = paragraph_text(&xml, b"t", b"p")?;
        sections.push(ParsedSection {
            label: Some(format!("slide {}", i + 1)),
            text,
        });
    }
    Ok(sections)
}

pub fn docx_sections(bytes: &[u8]) -> Result<Vec<ParsedSection>> {
    let package = OoxmlPackage::from_bytes(bytes)?;
    let main = package
        .main_part()
        .unwrap_or_else(|_| "word/document.xml".to_string());
    if !package.contains(&main) {
        return Err(anyhow!("Document body {} is missing", main));
    }
    let xml = package.read_xml(&main)?;
    Ok(vec![ParsedSection {
        label: None,
        text: paragraph_text(&xml, b"t", b"p")?,
    }])
}

/// Slide part names in `sldIdLst` order.
fn ordered_slide_parts(package: &OoxmlPackage) -> Result<Vec<String>> {
    let main = match package.main_part() {
        Ok(main) if package.contains(&main) => main,
        _ => return Ok(Vec::new()),
    };
    let rels = package.relationships(&main)?;
    let xml = package.read_xml(&main)?;

    let mut parts = Vec::new();
    let mut reader = Reader::from_str(&xml);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.name().local_name().as_ref() == b"sldId" =>
            {
                let rid = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.local_name().as_ref() == b"id" && a.key.prefix().is_some())
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                if let Some(rel) = rid.as_deref().and_then(|id| rels.get(id)) {
                    if rel.rel_type == REL_SLIDE {
                        parts.push(resolve_path(&main, &rel.target));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("Invalid presentation XML: {}", e)),
            _ => {}
        }
    }
    Ok(parts)
}

fn slide_number(part: &str) -> u32 {
    part.trim_start_matches("ppt/slides/slide")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(u32::MAX)
}

/// Collect the text of `text_tag` runs, one line per `para_tag` paragraph.
/// Tabs and breaks inside WordprocessingML runs become `\t` and `\n`.
fn paragraph_text(xml: &str, text_tag: &[u8], para_tag: &[u8]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_props = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = name.local_name();
                if local.as_ref() == text_tag {
                    in_text = true;
                } else if local.as_ref() == b"pPr" {
                    in_props = true;
                }
            }
            Ok(Event::Empty(e)) if !in_props => match e.name().local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| anyhow!("Invalid text run: {}", e))?;
                current.push_str(&text);
            }
            Ok(Event::CData(t)) if in_text => {
                current.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = name.local_name();
                if local.as_ref() == text_tag {
                    in_text = false;
                } else if local.as_ref() == b"pPr" {
                    in_props = false;
                } else if local.as_ref() == para_tag {
                    let line = std::mem::take(&mut current);
                    if !line.trim().is_empty() {
                        lines.push(line);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("Invalid XML at {}: {}", reader.buffer_position(), e)),
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        lines.push(current);
    }
    Ok(lines.join("\n"))
}
