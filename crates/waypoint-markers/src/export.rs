//! JSON export payload
//!
//! The export is a bare pretty-printed array of [`ExportedMarker`] with no
//! envelope or version field.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::error::MarkerError;
use crate::marker::ExportedMarker;
use crate::Result;

pub fn to_json_pretty(markers: &[ExportedMarker]) -> Result<String> {
    Ok(serde_json::to_string_pretty(markers)?)
}

/// `markers_YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("markers_{}.json", date.format("%Y-%m-%d"))
}

/// A file offered to the user for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

impl ExportFile {
    pub const MIME_TYPE: &'static str = "application/json";

    pub fn new(markers: &[ExportedMarker], date: NaiveDate) -> Result<Self> {
        if markers.is_empty() {
            return Err(MarkerError::NothingSaved);
        }

        Ok(Self {
            file_name: export_file_name(date),
            contents: to_json_pretty(markers)?,
        })
    }

    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, self.contents.as_bytes())?;

        tracing::info!(path = %path.display(), bytes = self.contents.len(), "Wrote marker export");

        Ok(path)
    }
}
