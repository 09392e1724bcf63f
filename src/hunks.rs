// src/hunks.rs

//! Hunk extraction from unified diff text.
//!
//! The extractor walks the diff line by line, classifying each line and
//! moving between [`Section`] states. A hunk is closed when a context line
//! follows a run of additions or deletions; a header starts a fresh one.

use crate::error::HunkError;
use crate::model::{Hunk, LineNumber};

pub const NO_NEWLINE_MARKER: &str = r"\ No newline at end of file";

/// Role of a single diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Header,
    Deletion,
    Addition,
    NoNewline,
    Context,
}

impl LineKind {
    /// Expects a line that has already been right-trimmed.
    pub fn classify(line: &str) -> LineKind {
        if line.starts_with("@@") {
            LineKind::Header
        } else if line.starts_with('-') {
            LineKind::Deletion
        } else if line.starts_with('+') {
            LineKind::Addition
        } else if line == NO_NEWLINE_MARKER {
            LineKind::NoNewline
        } else {
            LineKind::Context
        }
    }
}

/// State of the extractor after consuming a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Unchanged,
    Added,
    Deleted,
}

impl Section {
    /// Section entered by a line of the given kind. The no-newline marker
    /// leaves the state untouched.
    pub fn after(self, kind: LineKind) -> Section {
        match kind {
            LineKind::Header => Section::Header,
            LineKind::Deletion => Section::Deleted,
            LineKind::Addition => Section::Added,
            LineKind::NoNewline => self,
            LineKind::Context => Section::Unchanged,
        }
    }

    /// Whether moving from `self` to `next` closes the pending hunk.
    pub fn closes_hunk(self, next: Section) -> bool {
        next == Section::Unchanged && matches!(self, Section::Added | Section::Deleted)
    }
}

/// Start lines of a `@@ -a,b +c,d @@` range descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: LineNumber,
    pub new_start: LineNumber,
}

impl HunkHeader {
    pub fn parse(line: &str) -> Result<HunkHeader, HunkError> {
        let malformed = || HunkError::MalformedHeader(line.to_string());

        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("@@") {
            return Err(malformed());
        }
        let old = tokens.next().and_then(|t| t.strip_prefix('-')).ok_or_else(malformed)?;
        let new = tokens.next().and_then(|t| t.strip_prefix('+')).ok_or_else(malformed)?;

        Ok(HunkHeader {
            old_start: range_start(old).ok_or_else(malformed)?,
            new_start: range_start(new).ok_or_else(malformed)?,
        })
    }
}

// "12,4" or "12"
fn range_start(range: &str) -> Option<LineNumber> {
    let (start, count) = match range.split_once(',') {
        Some((start, count)) => (start, Some(count)),
        None => (range, None),
    };
    if let Some(count) = count {
        count.parse::<u64>().ok()?;
    }
    start.parse::<u64>().ok().and_then(|n| LineNumber::try_from(n).ok())
}

/// Running line counters for the pre-image (deletions) and post-image
/// (additions). Both advance on every line before the line is classified;
/// the side a line does not belong to is then stepped back.
#[derive(Debug, Default)]
struct Cursors {
    delete: LineNumber,
    add: LineNumber,
}

impl Cursors {
    fn advance(&mut self) {
        self.delete += 1;
        self.add += 1;
    }

    fn reset(&mut self, header: HunkHeader) {
        self.delete = header.old_start - 1;
        self.add = header.new_start - 1;
    }
}

/// Splits a unified diff into hunks of added and deleted lines.
///
/// The text is expected to start at the first `@@` header; blank lines before
/// it are tolerated, anything else is an error. Hunks without a single added
/// or deleted line are never returned.
pub fn extract_hunks(text: &str) -> Result<Vec<Hunk>, HunkError> {
    let mut hunks = Vec::new();
    let mut chunk = Hunk::default();
    let mut cursors = Cursors::default();
    let mut seen_header = false;
    let mut prev = Section::Unchanged;

    for (line_index, raw) in text.split('\n').enumerate() {
        let line = raw.trim_end();
        let kind = LineKind::classify(line);

        if !seen_header {
            match kind {
                LineKind::Header => seen_header = true,
                LineKind::Context if line.is_empty() => continue,
                _ => {
                    return Err(HunkError::ContentBeforeHeader {
                        line_index,
                        text: line.to_string(),
                    })
                }
            }
        }

        cursors.advance();
        match kind {
            LineKind::Header => {
                cursors.reset(HunkHeader::parse(line)?);
                if !chunk.is_empty() {
                    tracing::debug!(line_index, "header replaces a hunk that was never closed");
                }
                chunk = Hunk::default();
            }
            LineKind::Deletion => {
                cursors.add -= 1;
                chunk.deleted.push((cursors.delete, line[1..].to_string()));
            }
            LineKind::Addition => {
                cursors.delete -= 1;
                chunk.added.push((cursors.add, line[1..].to_string()));
            }
            LineKind::NoNewline => {
                cursors.delete -= 1;
                cursors.add -= 1;
            }
            LineKind::Context => {}
        }

        let next = prev.after(kind);
        if prev.closes_hunk(next) && !chunk.is_empty() {
            hunks.push(std::mem::take(&mut chunk));
        }
        prev = next;
    }

    if !chunk.is_empty() {
        hunks.push(chunk);
    }

    Ok(hunks)
}
