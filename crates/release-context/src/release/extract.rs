//! Per-tool metadata extraction for released outputs.
//!
//! An [`ExtractorTable`] maps a producer kind (the tool name) to an
//! [`Extractor`]. Kinds without an entry use the fallback, which only
//! measures the output. The default table registers [`ReadExtractor`] for
//! `read`, which also recovers the file's line count.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::conversation::CompletedState;

/// Title used when a completed part has none.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Trailer the `read` tool appends when it reaches the end of a file.
static END_OF_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(End of file - total (\d+) lines\)").expect("end-of-file pattern is valid")
});

/// `<file>` block wrapping the `read` tool's numbered content.
static FILE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<file>\n(.+?)\n</file>").expect("file block pattern is valid")
});

/// What was released from one tool call.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    /// The part's display title (a file path for `read`).
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<usize>,
    /// UTF-8 byte length of the original output.
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_tokens: Option<usize>,
}

/// Derives a [`ReleaseRecord`] (without token savings) from a completed
/// call's title and output.
pub trait Extractor: Send + Sync {
    fn extract(&self, title: &str, output: &str) -> ReleaseRecord;
}

/// Fallback: title and byte size only.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericExtractor;

impl Extractor for GenericExtractor {
    fn extract(&self, title: &str, output: &str) -> ReleaseRecord {
        ReleaseRecord {
            path: title.to_string(),
            lines: None,
            size: output.len(),
            saved_tokens: None,
        }
    }
}

/// `read` results: adds the file's line count when the output reveals it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadExtractor;

impl ReadExtractor {
    /// The end-of-file trailer wins; otherwise count the lines inside the
    /// `<file>` block. `None` when neither is present.
    pub fn line_count(output: &str) -> Option<usize> {
        if let Some(n) = END_OF_FILE
            .captures(output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            return Some(n);
        }
        FILE_BLOCK
            .captures(output)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().split('\n').count())
    }
}

impl Extractor for ReadExtractor {
    fn extract(&self, title: &str, output: &str) -> ReleaseRecord {
        ReleaseRecord {
            lines: Self::line_count(output),
            ..GenericExtractor.extract(title, output)
        }
    }
}

/// Dispatch table from producer kind to extractor.
pub struct ExtractorTable {
    by_kind: HashMap<String, Box<dyn Extractor>>,
    fallback: Box<dyn Extractor>,
}

impl ExtractorTable {
    /// A table with no kind-specific entries.
    pub fn empty() -> Self {
        Self {
            by_kind: HashMap::new(),
            fallback: Box::new(GenericExtractor),
        }
    }

    /// Register an extractor for a kind. Replaces any existing entry.
    pub fn register(&mut self, kind: impl Into<String>, extractor: impl Extractor + 'static) {
        self.by_kind.insert(kind.into(), Box::new(extractor));
    }

    /// Register an extractor (builder pattern).
    pub fn with(mut self, kind: impl Into<String>, extractor: impl Extractor + 'static) -> Self {
        self.register(kind, extractor);
        self
    }

    /// Extract the record for a completed call of the given kind.
    pub fn extract(&self, kind: &str, state: &CompletedState) -> ReleaseRecord {
        let title = if state.title.is_empty() {
            UNKNOWN_TITLE
        } else {
            state.title.as_str()
        };
        let extractor = self
            .by_kind
            .get(kind)
            .map_or(self.fallback.as_ref(), |e| e.as_ref());
        extractor.extract(title, &state.output)
    }
}

impl Default for ExtractorTable {
    fn default() -> Self {
        Self::empty().with("read", ReadExtractor)
    }
}

impl fmt::Debug for ExtractorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorTable")
            .field("kinds", &self.by_kind.keys().collect::<Vec<_>>())
            .finish()
    }
}
