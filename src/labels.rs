// src/labels.rs

use crate::error::ConfigError;
use crate::model::{scalar_text, BugDiffRecord};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Display configuration for categories: colours and short aliases.
///
/// Loaded from a JSON file such as
/// `{"palette": {"Quantum": [255, 127, 14]}, "aliases": {"Wrong Concept": "cptSwap"}}`;
/// omitted sections fall back to the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub palette: BTreeMap<String, [u8; 3]>,
    pub aliases: BTreeMap<String, String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        // matplotlib tab10 orange and blue
        let palette = BTreeMap::from([
            ("Quantum".to_string(), [255, 127, 14]),
            ("Classical".to_string(), [31, 119, 180]),
        ]);
        LabelConfig { palette, aliases: BTreeMap::new() }
    }
}

impl LabelConfig {
    pub fn load(path: &Path) -> Result<LabelConfig, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Alias of a category, or the category with a capital first letter.
    pub fn display_name(&self, category: &str) -> String {
        match self.aliases.get(category) {
            Some(alias) => alias.clone(),
            None => capitalize(category),
        }
    }

    pub fn color(&self, category: &str) -> Option<[u8; 3]> {
        self.palette.get(category).copied()
    }
}

pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Splits a multi-label value such as `"Crash, Failing Test"` into its
/// trimmed labels. Non-string scalars yield a single label.
pub fn expand_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(String::from)
            .collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

/// How many times each label of `key` was annotated across the bugs. Labels
/// that share an alias are counted together under that alias.
pub fn count_annotations(bugs: &[BugDiffRecord], key: &str, config: &LabelConfig) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for bug in bugs {
        let Some(value) = bug_field(bug, key) else {
            tracing::debug!(bug = %bug.comprehensive_id, key, "bug has no such field");
            continue;
        };
        for label in expand_values(&value) {
            let label = config.aliases.get(&label).cloned().unwrap_or(label);
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    counts
}

/// Looks a column up on a bug record, key columns included.
pub fn bug_field(bug: &BugDiffRecord, key: &str) -> Option<Value> {
    match key {
        "human_id" => Some(Value::from(bug.human_id.as_str())),
        "id" => Some(bug.id.clone()),
        "project_name" => Some(Value::from(bug.project_name.as_str())),
        "commit_hash" => Some(Value::from(bug.commit_hash.as_str())),
        "comprehensive_id" => Some(Value::from(bug.comprehensive_id.as_str())),
        _ => bug.metadata.get(key).cloned(),
    }
}
