// src/export.rs

use crate::error::ReportError;
use crate::model::*;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    /// RFC 3339 timestamp of the run
    pub generated_at: String,
    pub per_file: &'a [FileDiffRecord],
    pub per_bug: &'a [BugDiffRecord],
}

impl<'a> Report<'a> {
    pub fn new(per_file: &'a [FileDiffRecord], per_bug: &'a [BugDiffRecord]) -> Self {
        Report { generated_at: chrono::Utc::now().to_rfc3339(), per_file, per_bug }
    }
}

pub fn write_json(report: &Report<'_>, path: &Path) -> Result<(), ReportError> {
    let text = serde_json::to_string_pretty(report).map_err(|e| ReportError::io(path, e.into()))?;
    fs::write(path, text).map_err(|e| ReportError::io(path, e))
}

/// Plain-text table of per-bug totals, one row per bug.
pub fn format_table(bugs: &[BugDiffRecord]) -> String {
    let id_width = bugs
        .iter()
        .map(|b| b.comprehensive_id.chars().count())
        .max()
        .unwrap_or(0)
        .max("bug".len());
    let project_width = bugs
        .iter()
        .map(|b| b.project_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("project".len());

    let mut out = format!(
        "{:<id_width$}  {:<project_width$}  {:>7}  {:>7}  {:>7}\n",
        "bug", "project", "files", "hunks", "lines"
    );
    for bug in bugs {
        out.push_str(&format!(
            "{:<id_width$}  {:<project_width$}  {:>7}  {:>7}  {:>7}\n",
            bug.comprehensive_id, bug.project_name, bug.n_files, bug.n_hunks, bug.n_lines
        ));
    }
    out
}
