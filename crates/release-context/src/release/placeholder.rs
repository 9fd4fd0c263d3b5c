//! The placeholder written in place of a released tool output.
//!
//! The sentinel prefix is the only persisted release marker: there is no
//! separate flag on the part. Both the placeholder writer and the
//! "already released?" check reference [`RELEASED_PREFIX`] so they can't
//! drift out of sync.

use chrono::{DateTime, SecondsFormat, Utc};

use super::extract::ReleaseRecord;

/// Prefix of every released tool output.
pub const RELEASED_PREFIX: &str = "[Context released:";

/// Whether a tool output has already been replaced by a placeholder.
pub fn is_released(output: &str) -> bool {
    output.starts_with(RELEASED_PREFIX)
}

/// Render the placeholder for one released call.
///
/// ```text
/// [Context released: read]
/// - Title: src/main.rs
/// - Lines: 150
/// - Size: 5320 bytes (5.20 KB)
/// - Tokens saved: ~1330
/// - Released at: 2026-01-01T00:00:00.000Z
/// ```
///
/// `Lines` and `Tokens saved` appear only when the record carries them.
pub fn render_placeholder(kind: &str, record: &ReleaseRecord, released_at: DateTime<Utc>) -> String {
    let mut lines = Vec::with_capacity(6);
    lines.push(format!("{RELEASED_PREFIX} {kind}]"));
    lines.push(format!("- Title: {}", record.path));
    if let Some(n) = record.lines {
        lines.push(format!("- Lines: {n}"));
    }
    lines.push(format!(
        "- Size: {} bytes ({:.2} KB)",
        record.size,
        record.size as f64 / 1024.0
    ));
    if let Some(tokens) = record.saved_tokens {
        lines.push(format!("- Tokens saved: ~{tokens}"));
    }
    lines.push(format!(
        "- Released at: {}",
        released_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    lines.join("\n")
}
