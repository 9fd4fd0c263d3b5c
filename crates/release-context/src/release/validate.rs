//! Target validation. Runs to completion before anything is written.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::ReleaseTarget;
use super::error::ReleaseError;
use crate::conversation::{Message, ToolPart, ToolState};

/// Check a batch of explicitly named call ids against the conversation.
///
/// In order: no id repeats, every id resolves to a tool part, no id resolves
/// to more than one part, every part completed, and no output is already a
/// placeholder. Unresolved and ambiguous ids are reported together; the
/// state checks fail on the first offending target. On success the targets
/// are returned in the order of `call_ids`.
pub fn validate_targets<'a>(
    messages: &'a [Message],
    call_ids: &[String],
) -> Result<Vec<ReleaseTarget<'a>>, ReleaseError> {
    let mut seen = HashSet::with_capacity(call_ids.len());
    let mut repeated: Vec<String> = Vec::new();
    for id in call_ids {
        if !seen.insert(id.as_str()) && !repeated.contains(id) {
            repeated.push(id.clone());
        }
    }
    if !repeated.is_empty() {
        warn!("Rejected release: duplicate call ids {repeated:?}");
        return Err(ReleaseError::DuplicateTarget(repeated));
    }

    let mut by_call_id: HashMap<&str, Vec<&ToolPart>> = HashMap::with_capacity(call_ids.len());
    for part in messages.iter().flat_map(Message::tool_parts) {
        if seen.contains(part.call_id.as_str()) {
            by_call_id
                .entry(part.call_id.as_str())
                .or_default()
                .push(part);
        }
    }

    let missing: Vec<String> = call_ids
        .iter()
        .filter(|id| !by_call_id.contains_key(id.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        warn!("Rejected release: unknown call ids {missing:?}");
        return Err(ReleaseError::TargetNotFound(missing));
    }

    let ambiguous: Vec<String> = call_ids
        .iter()
        .filter(|id| by_call_id[id.as_str()].len() > 1)
        .cloned()
        .collect();
    if !ambiguous.is_empty() {
        warn!("Rejected release: call ids on more than one part {ambiguous:?}");
        return Err(ReleaseError::AmbiguousTarget(ambiguous));
    }

    let mut targets = Vec::with_capacity(call_ids.len());
    for id in call_ids {
        let part = by_call_id[id.as_str()][0];
        let ToolState::Completed(state) = &part.state else {
            let status = part.state.status();
            warn!("Rejected release: call {id} is {status}");
            return Err(ReleaseError::TargetNotTerminal {
                call_id: id.clone(),
                status,
            });
        };
        if part.is_released() {
            warn!("Rejected release: call {id} was already released");
            return Err(ReleaseError::TargetAlreadyReleased {
                call_id: id.clone(),
            });
        }
        targets.push(ReleaseTarget { part, state });
    }

    debug!("Validated {} release target(s)", targets.len());
    Ok(targets)
}
