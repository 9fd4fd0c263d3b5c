//! Auto-selection of the most recent releasable tool calls.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::ReleaseTarget;
use super::report::SkipCounts;
use crate::config::ReleaseConfig;
use crate::conversation::Message;

/// Parts chosen for release, plus what was passed over.
#[derive(Debug, Clone, Default)]
pub struct Selection<'a> {
    /// Oldest first.
    pub targets: Vec<ReleaseTarget<'a>>,
    pub skipped: SkipCounts,
}

/// Pick the `count` most recent releasable calls in the conversation.
///
/// A call is releasable when it completed, its output is not already a
/// placeholder, its tool is in `tools` (when non-empty) and not protected by
/// `config`, and its output meets `config.min_output_bytes`. Pending and
/// running calls and already-released calls are tallied in
/// [`Selection::skipped`] before the tool filters apply. A call id that
/// appears on more than one tool part is never selected. A non-positive
/// `count` selects nothing.
pub fn select_candidates<'a>(
    messages: &'a [Message],
    count: i64,
    tools: &[String],
    config: &ReleaseConfig,
) -> Selection<'a> {
    let allow: HashSet<&str> = tools.iter().map(String::as_str).collect();
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for part in messages.iter().flat_map(Message::tool_parts) {
        *occurrences.entry(part.call_id.as_str()).or_default() += 1;
    }

    let mut skipped = SkipCounts::default();
    let mut candidates: Vec<(usize, ReleaseTarget<'a>)> = Vec::new();

    for (message_index, message) in messages.iter().enumerate() {
        for part in message.tool_parts() {
            let Some(state) = part.completed_state() else {
                if !part.state.status().is_terminal() {
                    skipped.not_terminal += 1;
                }
                continue;
            };
            if part.is_released() {
                skipped.already_released += 1;
                continue;
            }
            if !allow.is_empty() && !allow.contains(part.tool.as_str()) {
                continue;
            }
            if config.protected_tools.contains(&part.tool)
                || state.output.len() < config.min_output_bytes
            {
                continue;
            }
            if occurrences.get(part.call_id.as_str()).copied().unwrap_or(0) > 1 {
                warn!(
                    "Not auto-selecting call {}: its id appears on more than one tool part",
                    part.call_id
                );
                continue;
            }
            candidates.push((message_index, ReleaseTarget { part, state }));
        }
    }

    // Scan order is already ascending; the stable sort keeps part order
    // within a message.
    candidates.sort_by_key(|(index, _)| *index);

    let available = candidates.len();
    let take = usize::try_from(count).unwrap_or(0).min(available);
    let targets: Vec<ReleaseTarget<'a>> = candidates
        .split_off(available - take)
        .into_iter()
        .map(|(_, target)| target)
        .collect();

    debug!(
        "Selected {} of {available} candidate tool call(s) ({} unfinished, {} already released)",
        targets.len(),
        skipped.not_terminal,
        skipped.already_released,
    );

    Selection { targets, skipped }
}
