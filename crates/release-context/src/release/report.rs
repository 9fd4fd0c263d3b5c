//! Human-readable summaries and the structured release result.

use serde::Serialize;

use super::extract::ReleaseRecord;

pub const RELEASED_TITLE: &str = "Released Context";
pub const NO_CANDIDATES_TITLE: &str = "No Tool Calls Found";

/// Parts auto-selection passed over. Always zero for explicit targets.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkipCounts {
    /// Still pending or running.
    pub not_terminal: usize,
    /// Output already replaced by a placeholder.
    pub already_released: usize,
}

/// Structured result of a release call.
#[derive(Serialize, Debug, Clone)]
pub struct ReleaseOutcome {
    pub title: String,
    pub metadata: ReleaseMetadata,
    /// Text shown to the model.
    pub output: String,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMetadata {
    pub released_count: usize,
    pub saved_tokens: usize,
    pub files: Vec<ReleaseRecord>,
}

impl ReleaseOutcome {
    /// Result for a batch that was written to the store.
    pub fn released(files: Vec<ReleaseRecord>, saved_tokens: usize, skipped: SkipCounts) -> Self {
        let output = render_summary(&files, saved_tokens, skipped);
        Self {
            title: RELEASED_TITLE.to_string(),
            metadata: ReleaseMetadata {
                released_count: files.len(),
                saved_tokens,
                files,
            },
            output,
        }
    }

    /// Result when auto-selection found nothing to release. Not an error.
    pub fn no_candidates(skipped: SkipCounts) -> Self {
        let mut output = String::from("No completed tool calls found to release.");
        if skipped.not_terminal > 0 {
            output.push_str(&format!(
                " Skipped {} running tool(s) - they must finish first.",
                skipped.not_terminal
            ));
        }
        if skipped.already_released > 0 {
            output.push_str(&format!(
                " Skipped {} already released tool(s).",
                skipped.already_released
            ));
        }
        Self {
            title: NO_CANDIDATES_TITLE.to_string(),
            metadata: ReleaseMetadata::default(),
            output,
        }
    }
}

/// Render the summary shown after a successful release.
pub fn render_summary(files: &[ReleaseRecord], saved_tokens: usize, skipped: SkipCounts) -> String {
    let mut lines = Vec::with_capacity(files.len() * 3 + 6);
    lines.push(format!("✅ Successfully released {} tool call(s)", files.len()));
    if skipped.not_terminal > 0 {
        lines.push(format!(
            "⏭️  Skipped {} running tool(s) - must finish first",
            skipped.not_terminal
        ));
    }
    if skipped.already_released > 0 {
        lines.push(format!(
            "⏭️  Skipped {} already released tool(s)",
            skipped.already_released
        ));
    }

    lines.push(String::new());
    lines.push("**Summary:**".to_string());
    for file in files {
        lines.push(format!("- {}", file.path));
        if let Some(n) = file.lines {
            lines.push(format!("  Lines: {n}"));
        }
        lines.push(format!("  Saved: ~{} tokens", file.saved_tokens.unwrap_or(0)));
    }

    lines.push(String::new());
    lines.push(format!("**Total saved:** ~{saved_tokens} tokens"));
    lines.join("\n")
}
