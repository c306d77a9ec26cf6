//! Text and JSON rendering of status records

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use vcstatus_core::status::{FileStatus, FileStatusRecord};

/// One line of `pending --json` output
#[derive(Debug, Serialize)]
pub struct StatusEntry<'a> {
    pub path: &'a Path,
    pub status: FileStatus,
    pub code: char,
}

impl<'a> From<&'a FileStatusRecord> for StatusEntry<'a> {
    fn from(record: &'a FileStatusRecord) -> Self {
        Self {
            path: &record.path,
            status: record.status,
            code: record.status.code(),
        }
    }
}

/// `<code> <path>` for one path
pub fn status_line(path: &Path, status: FileStatus) -> String {
    format!("{} {}", status.code(), path.display())
}

/// One status line per record
pub fn render_text(records: &[FileStatusRecord]) -> String {
    records
        .iter()
        .map(|record| status_line(&record.path, record.status))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_json(records: &[FileStatusRecord]) -> Result<String> {
    let entries: Vec<StatusEntry<'_>> = records.iter().map(StatusEntry::from).collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}
