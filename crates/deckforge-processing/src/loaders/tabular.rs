//! CSV, spreadsheet, and XML parsers

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader as _};
use quick_xml::events::Event;
use quick_xml::Reader;

use super::ParsedSection;

/// One section per record, rendered as `header: value` lines.
pub fn parse_csv(path: &Path) -> Result<Vec<ParsedSection>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("Failed to open CSV file")?;
    let headers = reader.headers().context("Failed to read CSV header")?.clone();

    let mut sections = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid CSV record {}", i + 1))?;
        let text = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| format!("{}: {}", h.trim(), v.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(ParsedSection {
            label: Some(format!("row {}", i)),
            text,
        });
    }
    Ok(sections)
}

/// One section per non-empty worksheet, rows tab-separated.
pub fn parse_spreadsheet(path: &Path) -> Result<Vec<ParsedSection>> {
    let mut workbook = open_workbook_auto(path).context("Failed to open workbook")?;
    let mut sections = Vec::new();

    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| anyhow!("Failed to read sheet {}: {}", name, e))?;

        let rows: Vec<String> = range
            .rows()
            .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
            .map(|row| {
                row.iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join("\t")
                    .trim_end()
                    .to_string()
            })
            .collect();

        if rows.is_empty() {
            continue;
        }
        sections.push(ParsedSection {
            label: Some(name.clone()),
            text: rows.join("\n"),
        });
    }
    Ok(sections)
}

/// Every non-blank text node of the document, one per line.
pub fn parse_xml(path: &Path) -> Result<Vec<ParsedSection>> {
    let bytes = std::fs::read(path).context("Failed to read XML file")?;
    let xml = String::from_utf8_lossy(&bytes);
    Ok(vec![ParsedSection {
        label: None,
        text: xml_text(&xml)?,
    }])
}

fn xml_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut lines = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| anyhow!("Invalid XML text: {}", e))?;
                if !text.trim().is_empty() {
                    lines.push(text.trim().to_string());
                }
            }
            Ok(Event::CData(t)) => {
                let text = String::from_utf8_lossy(&t).trim().to_string();
                if !text.is_empty() {
                    lines.push(text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("Invalid XML at {}: {}", reader.buffer_position(), e)),
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}
