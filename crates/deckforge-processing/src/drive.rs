//! Google Drive acquisition
//!
//! Google Docs, Sheets, and Slides are exported to their Office equivalents;
//! other Drive files (PDFs) are downloaded directly. Large files answer the
//! direct download with a virus-scan confirmation page, whose form carries the
//! token needed to fetch the real bytes.

use anyhow::{anyhow, Context, Result};
use regex::Regex;

use crate::fetch::{Downloader, Fetched};

const DOCS_BASE: &str = "https://docs.google.com";
const DRIVE_BASE: &str = "https://drive.google.com";
const USERCONTENT_BASE: &str = "https://drive.usercontent.google.com";

/// Office format a native Google file is exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Docx,
    Xlsx,
    Pptx,
}

impl ExportFormat {
    fn path_segment(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "document",
            ExportFormat::Xlsx => "spreadsheets",
            ExportFormat::Pptx => "presentation",
        }
    }

    fn format(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pptx => "pptx",
        }
    }
}

#[derive(Clone)]
pub struct DriveClient {
    downloader: Downloader,
    docs_base: String,
    drive_base: String,
    usercontent_base: String,
}

impl DriveClient {
    pub fn new(downloader: Downloader) -> Self {
        Self::with_bases(downloader, DOCS_BASE, DRIVE_BASE, USERCONTENT_BASE)
    }

    pub fn with_bases(
        downloader: Downloader,
        docs_base: impl Into<String>,
        drive_base: impl Into<String>,
        usercontent_base: impl Into<String>,
    ) -> Self {
        Self {
            downloader,
            docs_base: docs_base.into().trim_end_matches('/').to_string(),
            drive_base: drive_base.into().trim_end_matches('/').to_string(),
            usercontent_base: usercontent_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// File id from `/d/<id>` paths or an `id=<id>` query parameter.
    pub fn file_id(url: &str) -> Option<String> {
        let parsed = reqwest::Url::parse(url).ok()?;

        let mut segments = parsed.path_segments()?;
        while let Some(segment) = segments.next() {
            if segment == "d" {
                if let Some(id) = segments.next().filter(|id| is_valid_id(id)) {
                    return Some(id.to_string());
                }
            }
        }

        parsed
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned())
            .filter(|id| is_valid_id(id))
    }

    pub async fn export(&self, url: &str, format: ExportFormat) -> Result<Fetched> {
        let id = Self::file_id(url).ok_or_else(|| anyhow!("Not a Google Drive link"))?;
        let export_url = format!(
            "{}/{}/d/{}/export?format={}",
            self.docs_base,
            format.path_segment(),
            id,
            format.format()
        );
        tracing::debug!(file_id = %id, format = format.format(), "Exporting Google Drive file");
        self.downloader.fetch(&export_url).await
    }

    pub async fn download(&self, url: &str) -> Result<Fetched> {
        let id = Self::file_id(url).ok_or_else(|| anyhow!("Not a Google Drive link"))?;
        let download_url = format!("{}/uc?export=download&id={}", self.drive_base, id);
        let fetched = self.downloader.fetch(&download_url).await?;
        if !fetched.is_html() {
            return Ok(fetched);
        }

        let page = String::from_utf8_lossy(&fetched.bytes);
        let (confirm, uuid) = confirmation_token(&page)?.ok_or_else(|| {
            anyhow!("Google Drive returned a page instead of the file; is it shared publicly?")
        })?;
        tracing::debug!(file_id = %id, "Following Google Drive download confirmation");

        let mut confirmed_url = format!(
            "{}/download?id={}&export=download&confirm={}",
            self.usercontent_base, id, confirm
        );
        if let Some(uuid) = uuid {
            confirmed_url.push_str(&format!("&uuid={}", uuid));
        }
        let confirmed = self.downloader.fetch(&confirmed_url).await?;
        if confirmed.is_html() {
            return Err(anyhow!("Google Drive refused the download"));
        }
        Ok(confirmed)
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Confirm token and uuid from the virus-scan warning form.
fn confirmation_token(page: &str) -> Result<Option<(String, Option<String>)>> {
    let confirm_input = Regex::new(r#"name="confirm"\s+value="([0-9A-Za-z_\-]+)""#)
        .context("Failed to compile confirm token regex")?;
    let confirm_query = Regex::new(r"confirm=([0-9A-Za-z_\-]+)")
        .context("Failed to compile confirm query regex")?;
    let uuid_input = Regex::new(r#"name="uuid"\s+value="([0-9A-Za-z_\-]+)""#)
        .context("Failed to compile uuid regex")?;

    let confirm = confirm_input
        .captures(page)
        .or_else(|| confirm_query.captures(page))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    let uuid = uuid_input
        .captures(page)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    Ok(confirm.map(|c| (c, uuid)))
}
