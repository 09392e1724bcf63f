// src/aggregate.rs

use crate::error::ReportError;
use crate::model::*;
use std::collections::BTreeMap;

/// Identity of one bug fix
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BugKey {
    pub human_id: String,
    pub id: String,
    pub project_name: String,
    pub commit_hash: String,
}

pub const KEY_COLUMNS: [&str; 4] = ["human_id", "id", "project_name", "commit_hash"];

impl BugKey {
    pub fn from_metadata(metadata: &Metadata) -> Result<BugKey, ReportError> {
        let field = |key: &'static str| {
            metadata
                .get(key)
                .and_then(scalar_text)
                .ok_or(ReportError::MissingMetadataKey(key))
        };
        Ok(BugKey {
            human_id: field("human_id")?,
            id: field("id")?,
            project_name: field("project_name")?,
            commit_hash: field("commit_hash")?,
        })
    }

    pub fn comprehensive_id(&self) -> String {
        format!("{} ({})", self.human_id, self.id)
    }
}

/// Per-bug totals plus the file records that could not be attributed to a bug
#[derive(Debug, Default)]
pub struct Aggregation {
    pub bugs: Vec<BugDiffRecord>,
    pub incomplete: Vec<(FileDiffRecord, ReportError)>,
}

/// Sums the per-file records of each bug. Metadata fields that agree across
/// all files of a bug are kept on the bug record; the rest are dropped.
pub fn aggregate_per_bug(records: &[FileDiffRecord]) -> Aggregation {
    let mut groups: BTreeMap<BugKey, Vec<&FileDiffRecord>> = BTreeMap::new();
    let mut incomplete = Vec::new();

    for record in records {
        match BugKey::from_metadata(&record.metadata) {
            Ok(key) => groups.entry(key).or_default().push(record),
            Err(error) => {
                tracing::warn!(filename = %record.filename, %error, "record left out of the per-bug totals");
                incomplete.push((record.clone(), error));
            }
        }
    }

    let bugs = groups
        .into_iter()
        .map(|(key, files)| {
            let metadata = shared_metadata(&files);
            let id = files
                .first()
                .and_then(|f| f.metadata.get("id").cloned())
                .unwrap_or_else(|| key.id.clone().into());
            BugDiffRecord {
                n_lines: files.iter().map(|f| f.n_lines).sum(),
                n_hunks: files.iter().map(|f| f.n_hunks).sum(),
                n_files: files.iter().map(|f| f.n_files).sum(),
                comprehensive_id: key.comprehensive_id(),
                human_id: key.human_id,
                id,
                project_name: key.project_name,
                commit_hash: key.commit_hash,
                metadata,
            }
        })
        .collect();

    Aggregation { bugs, incomplete }
}

fn shared_metadata(files: &[&FileDiffRecord]) -> Metadata {
    let Some((first, rest)) = files.split_first() else {
        return Metadata::new();
    };
    first
        .metadata
        .iter()
        .filter(|(key, _)| !KEY_COLUMNS.contains(&key.as_str()))
        .filter(|(key, value)| {
            let shared = rest.iter().all(|f| f.metadata.get(*key) == Some(*value));
            if !shared {
                tracing::debug!(key = %key, "metadata differs between files of one bug, dropped");
            }
            shared
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(filename: &str, n_hunks: usize, n_lines: usize, metadata: serde_json::Value) -> FileDiffRecord {
        let serde_json::Value::Object(metadata) = metadata else {
            panic!("metadata fixture must be an object");
        };
        FileDiffRecord { n_lines, n_hunks, filename: filename.into(), n_files: 1, metadata }
    }

    fn bug_metadata(human_id: &str, id: u32) -> serde_json::Value {
        json!({
            "human_id": human_id,
            "id": id,
            "project_name": "Cirq",
            "commit_hash": "a1b2c3",
            "type": "Quantum",
        })
    }

    #[test]
    fn test_sums_files_of_one_bug() {
        let records = vec![
            record("a.py", 2, 5, bug_metadata("Cirq#691", 7)),
            record("b.py", 1, 3, bug_metadata("Cirq#691", 7)),
        ];
        let aggregation = aggregate_per_bug(&records);
        assert!(aggregation.incomplete.is_empty());
        assert_eq!(aggregation.bugs.len(), 1);

        let bug = &aggregation.bugs[0];
        assert_eq!(bug.n_hunks, 3);
        assert_eq!(bug.n_lines, 8);
        assert_eq!(bug.n_files, 2);
        assert_eq!(bug.id, json!(7));
        assert_eq!(bug.comprehensive_id, "Cirq#691 (7)");
        assert_eq!(bug.metadata.get("type"), Some(&json!("Quantum")));
        assert!(!bug.metadata.contains_key("human_id"));
    }

    #[test]
    fn test_separate_bugs_stay_separate() {
        let records = vec![
            record("a.py", 1, 1, bug_metadata("Cirq#1", 1)),
            record("a.py", 4, 9, bug_metadata("Cirq#2", 2)),
        ];
        let bugs = aggregate_per_bug(&records).bugs;
        assert_eq!(bugs.len(), 2);
        assert_eq!(bugs[0].human_id, "Cirq#1");
        assert_eq!((bugs[1].n_hunks, bugs[1].n_lines, bugs[1].n_files), (4, 9, 1));
    }

    #[test]
    fn test_differing_metadata_dropped() {
        let mut other = bug_metadata("Cirq#1", 1);
        other["type"] = json!("Classical");
        let records = vec![record("a.py", 1, 1, bug_metadata("Cirq#1", 1)), record("b.py", 1, 1, other)];

        let bugs = aggregate_per_bug(&records).bugs;
        assert_eq!(bugs.len(), 1);
        assert!(!bugs[0].metadata.contains_key("type"));
    }

    #[test]
    fn test_id_type_matches_file_rows() {
        let mut textual = bug_metadata("Cirq#9", 9);
        textual["id"] = json!("9");
        let records = vec![record("a.py", 1, 2, bug_metadata("Cirq#8", 8)), record("b.py", 1, 2, textual)];

        let bugs = aggregate_per_bug(&records).bugs;
        let file_row = serde_json::to_value(&records[0]).unwrap();
        let bug_row = serde_json::to_value(&bugs[0]).unwrap();
        assert_eq!(bug_row["id"], file_row["id"]);
        assert_eq!(bugs[0].comprehensive_id, "Cirq#8 (8)");
        assert_eq!(bugs[1].id, json!("9"));
        assert_eq!(bugs[1].comprehensive_id, "Cirq#9 (9)");
    }

    #[test]
    fn test_incomplete_key_reported() {
        let records = vec![record("a.py", 1, 1, json!({"human_id": "x", "id": 1}))];
        let aggregation = aggregate_per_bug(&records);
        assert!(aggregation.bugs.is_empty());
        assert_eq!(aggregation.incomplete.len(), 1);
        assert!(matches!(aggregation.incomplete[0].1, ReportError::MissingMetadataKey("project_name")));
    }

    #[test]
    fn test_serialized_row_shape() {
        let records = vec![record("a.py", 2, 5, bug_metadata("Cirq#691", 7))];
        let row = serde_json::to_value(&aggregate_per_bug(&records).bugs[0]).unwrap();
        assert_eq!(row["comprehensive_id"], json!("Cirq#691 (7)"));
        assert_eq!(row["n_files"], json!(1));
        assert_eq!(row["type"], json!("Quantum"));
        assert_eq!(row["id"], json!(7));
    }
}
