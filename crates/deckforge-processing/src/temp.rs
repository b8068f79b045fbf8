//! Temporary copies of downloaded sources

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// A downloaded source spooled to disk for a parser that reads from a path.
///
/// The file lives exactly as long as this value, so it is removed on every
/// exit path, including parse failures and panics in the parser task.
#[derive(Debug)]
pub struct SourceFile {
    file: NamedTempFile,
}

impl SourceFile {
    /// Write `bytes` to a new file named `<uuid>.<extension>…`.
    pub fn spool(bytes: &[u8], extension: &str) -> Result<Self> {
        let prefix = format!("{}.{}", Uuid::new_v4(), extension);
        let suffix = format!(".{}", extension);
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile()
            .context("Failed to create temp file")?;
        file.write_all(bytes)
            .context("Failed to write source to temp file")?;
        file.flush().context("Failed to flush temp file")?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Path as a string, used as the error source identifier for parse failures.
    pub fn display_path(&self) -> String {
        self.file.path().display().to_string()
    }
}
