// src/analyzer.rs

use crate::error::ReportError;
use crate::hunks::extract_hunks;
use crate::model::*;
use git2::{DiffOptions, Patch};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const BEFORE_DIR: &str = "before";
pub const AFTER_DIR: &str = "after";
pub const METADATA_FILE: &str = "metadata.json";

/// Knobs for diff generation and batch processing
#[derive(Debug, Clone)]
pub struct DiffSettings {
    /// Unchanged lines around each change, as in `diff -U`
    pub context_lines: u32,
    pub show_progress: bool,
}

impl Default for DiffSettings {
    fn default() -> Self {
        DiffSettings { context_lines: 3, show_progress: false }
    }
}

/// A bug folder that could not be processed
#[derive(Debug)]
pub struct FolderFailure {
    pub folder: PathBuf,
    pub error: ReportError,
}

/// Per-file records of a whole batch, plus the folders that failed
#[derive(Debug, Default)]
pub struct Analysis {
    pub records: Vec<FileDiffRecord>,
    pub failures: Vec<FolderFailure>,
    pub folders_scanned: usize,
}

/// Walks `root/<project>/<bug>` folders and diffs each of them. An empty
/// `projects` list means every sub-directory of `root`.
pub fn analyze(root: &Path, projects: &[String], settings: &DiffSettings) -> Result<Analysis, ReportError> {
    let projects = if projects.is_empty() {
        list_dirs(root)?
            .into_iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect()
    } else {
        projects.to_vec()
    };

    // 1. Collect the bug folders of every project
    let mut bug_folders = Vec::new();
    for project in &projects {
        let project_dir = root.join(project);
        let folders = list_dirs(&project_dir)?;
        tracing::debug!(project = %project, folders = folders.len(), "found bug folders");
        bug_folders.extend(folders);
    }

    let bar = if settings.show_progress {
        ProgressBar::new(bug_folders.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_message("Diffing bug folders");

    // 2. Diff every folder independently; a failure stays local to its folder
    let outcomes: Vec<(PathBuf, Result<Vec<FileDiffRecord>, ReportError>)> = bug_folders
        .par_iter()
        .progress_with(bar.clone())
        .map(|folder| (folder.clone(), diff_bug_folder(folder, settings)))
        .collect();
    bar.finish_with_message("Diffing complete");

    let mut analysis = Analysis { folders_scanned: outcomes.len(), ..Analysis::default() };
    for (folder, outcome) in outcomes {
        match outcome {
            Ok(records) => analysis.records.extend(records),
            Err(error) => {
                tracing::warn!(folder = %folder.display(), %error, "skipping bug folder");
                analysis.failures.push(FolderFailure { folder, error });
            }
        }
    }

    analysis.records.sort_by_cached_key(|r| {
        let field = |key: &str| r.metadata.get(key).and_then(scalar_text).unwrap_or_default();
        (field("project_name"), field("human_id"), r.filename.clone())
    });

    Ok(analysis)
}

/// Diffs every file shared by `folder/before` and `folder/after`. Files whose
/// diff has no hunk produce no record.
pub fn diff_bug_folder(folder: &Path, settings: &DiffSettings) -> Result<Vec<FileDiffRecord>, ReportError> {
    let metadata = load_metadata(&folder.join(METADATA_FILE))?;
    let before_dir = snapshot_dir(folder, BEFORE_DIR)?;
    let after_dir = snapshot_dir(folder, AFTER_DIR)?;

    let mut records = Vec::new();
    for filename in common_files(&before_dir, &after_dir)? {
        let before = read_text(&before_dir.join(&filename))?;
        let after = read_text(&after_dir.join(&filename))?;

        let diff = unified_diff(&before, &after, settings.context_lines)
            .map_err(|source| ReportError::Diff { filename: filename.clone(), source })?;
        let hunks = extract_hunks(&diff)
            .map_err(|source| ReportError::Hunks { filename: filename.clone(), source })?;

        if hunks.is_empty() {
            continue;
        }
        records.push(FileDiffRecord {
            n_lines: hunks.iter().map(Hunk::modified_lines).sum(),
            n_hunks: hunks.len(),
            filename,
            n_files: 1,
            metadata: metadata.clone(),
        });
    }

    Ok(records)
}

/// Unified diff of two texts, starting at the first `@@` header. Line
/// terminators are normalised first, so a missing final newline is not a
/// change. At least one line of context is kept: without it adjacent hunks
/// would end on a change right before the next header.
pub fn unified_diff(before: &str, after: &str, context_lines: u32) -> Result<String, git2::Error> {
    let before = normalized(before);
    let after = normalized(after);

    let mut opts = DiffOptions::new();
    opts.context_lines(context_lines.max(1));
    // NUL bytes would otherwise turn the file into a binary diff without hunks
    opts.force_text(true);

    let mut patch = Patch::from_buffers(before.as_bytes(), None, after.as_bytes(), None, Some(&mut opts))?;
    let buf = patch.to_buf()?;
    let text = String::from_utf8_lossy(&buf);

    Ok(match text.find("@@") {
        Some(start) => text[start..].to_string(),
        None => String::new(),
    })
}

fn normalized(text: &str) -> String {
    text.lines().flat_map(|line| [line, "\n"]).collect()
}

/// Names of the regular files present in both directories, sorted
pub fn common_files(before: &Path, after: &Path) -> Result<Vec<String>, ReportError> {
    let before = file_names(before)?;
    let after = file_names(after)?;
    Ok(before.intersection(&after).cloned().collect())
}

fn file_names(dir: &Path) -> Result<BTreeSet<String>, ReportError> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir).map_err(|e| ReportError::io(dir, e))? {
        let path = entry.map_err(|e| ReportError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => {
                names.insert(name.to_string());
            }
            None => tracing::debug!(path = %path.display(), "ignoring non UTF-8 file name"),
        }
    }
    Ok(names)
}

/// Reads a bug folder's `metadata.json`, which must hold a JSON object.
pub fn load_metadata(path: &Path) -> Result<Metadata, ReportError> {
    let invalid = |reason: String| ReportError::Metadata { path: path.to_path_buf(), reason };

    let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
    let serde_json::Value::Object(mut metadata) = value else {
        return Err(invalid("expected a JSON object".to_string()));
    };

    for column in RESERVED_COLUMNS {
        if metadata.remove(column).is_some() {
            tracing::warn!(path = %path.display(), column, "metadata key shadows a record column, dropped");
        }
    }
    Ok(metadata)
}

fn snapshot_dir(folder: &Path, snapshot: &'static str) -> Result<PathBuf, ReportError> {
    let dir = folder.join(snapshot);
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(ReportError::MissingSnapshot { folder: folder.to_path_buf(), snapshot })
    }
}

fn read_text(path: &Path) -> Result<String, ReportError> {
    fs::read_to_string(path).map_err(|e| ReportError::io(path, e))
}

fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ReportError::io(dir, e))? {
        let path = entry.map_err(|e| ReportError::io(dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        } else {
            tracing::debug!(path = %path.display(), "not a directory, skipped");
        }
    }
    dirs.sort();
    Ok(dirs)
}
