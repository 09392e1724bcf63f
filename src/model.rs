// src/model.rs

use serde::Serialize;
use serde_json::{Map, Value};

/// Line number inside the pre- or post-image of a diff. Signed because an
/// `@@ -0,0 +1 @@` header starts its cursors at -1.
pub type LineNumber = i64;

/// Free-form fields read from a bug folder's `metadata.json`
pub type Metadata = Map<String, Value>;

/// Column names owned by the records themselves; metadata may not shadow them
pub const RESERVED_COLUMNS: [&str; 4] = ["n_lines", "n_hunks", "n_files", "filename"];

/// One contiguous region of change inside a unified diff
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    pub added: Vec<(LineNumber, String)>,
    pub deleted: Vec<(LineNumber, String)>,
}

impl Hunk {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }

    /// A replaced line counts once, so the larger side wins.
    pub fn modified_lines(&self) -> usize {
        self.added.len().max(self.deleted.len())
    }
}

/// Diff statistics for one changed file of one bug fix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDiffRecord {
    pub n_lines: usize,
    pub n_hunks: usize,
    pub filename: String,
    pub n_files: usize,
    #[serde(flatten)]
    pub metadata: Metadata,
}

/// Diff statistics summed over every changed file of one bug fix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BugDiffRecord {
    pub human_id: String,
    /// `id` exactly as `metadata.json` gives it, number or string
    pub id: Value,
    pub project_name: String,
    pub commit_hash: String,
    pub n_lines: usize,
    pub n_hunks: usize,
    pub n_files: usize,
    pub comprehensive_id: String,
    /// Remaining metadata fields that agree across all files of the bug
    #[serde(flatten)]
    pub metadata: Metadata,
}

/// Numeric column of a bug record
#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Modified lines
    Lines,
    /// Change hunks
    Hunks,
    /// Changed files
    Files,
}

impl Metric {
    pub fn of(self, bug: &BugDiffRecord) -> usize {
        match self {
            Metric::Lines => bug.n_lines,
            Metric::Hunks => bug.n_hunks,
            Metric::Files => bug.n_files,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Lines => "Modified Lines",
            Metric::Hunks => "Hunks",
            Metric::Files => "Files",
        }
    }
}

/// Renders a scalar metadata value as plain text (strings without quotes).
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_modified_lines_takes_larger_side() {
        let hunk = Hunk {
            added: vec![(3, "a".into())],
            deleted: vec![(3, "b".into()), (4, "c".into())],
        };
        assert_eq!(hunk.modified_lines(), 2);
        assert!(!hunk.is_empty());
        assert!(Hunk::default().is_empty());
    }

    #[test]
    fn test_file_record_flattens_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("project_name".into(), json!("qiskit"));
        let record = FileDiffRecord {
            n_lines: 4,
            n_hunks: 2,
            filename: "a.py".into(),
            n_files: 1,
            metadata,
        };
        let row = serde_json::to_value(&record).unwrap();
        assert_eq!(
            row,
            json!({"n_lines": 4, "n_hunks": 2, "filename": "a.py", "n_files": 1, "project_name": "qiskit"})
        );
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("abc")).as_deref(), Some("abc"));
        assert_eq!(scalar_text(&json!(7)).as_deref(), Some("7"));
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!([1])), None);
    }
}
