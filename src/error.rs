// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading unified diff text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HunkError {
    /// A `@@` line that is not shaped like `@@ -a,b +c,d @@`.
    #[error("malformed hunk header: {0:?}")]
    MalformedHeader(String),

    /// A non-blank line showed up before the first `@@` header.
    #[error("line {line_index} precedes the first hunk header: {text:?}")]
    ContentBeforeHeader { line_index: usize, text: String },
}

/// Errors raised while turning bug folders into diff records.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metadata in {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("{folder} has no {snapshot}/ directory")]
    MissingSnapshot { folder: PathBuf, snapshot: &'static str },

    #[error("metadata key `{0}` is missing or not a scalar")]
    MissingMetadataKey(&'static str),

    #[error("could not diff {filename}: {source}")]
    Diff {
        filename: String,
        #[source]
        source: git2::Error,
    },

    #[error("could not read hunks of {filename}: {source}")]
    Hunks {
        filename: String,
        #[source]
        source: HunkError,
    },
}

impl ReportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io { path: path.into(), source }
    }
}

/// Errors raised while loading the label configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid label configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while drawing or saving the histogram.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("nothing to plot: no bug records carry a value")]
    Empty,

    #[error("histogram cap {cap} exceeds the maximum of {max}")]
    CapTooLarge { cap: usize, max: usize },

    #[error("image size must be non-zero, got {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
