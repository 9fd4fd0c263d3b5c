//! Release rejections, worded for the model that made the call.

use crate::conversation::ToolStatus;
use crate::store::StoreError;

/// Why a release was rejected.
///
/// Every variant except [`ReleaseError::Store`] is raised before any part is
/// written. The display strings are shown to the model as-is, so they say
/// how to fix the call.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error(
        "Duplicate toolCallIds detected: {}. Each tool call can only be released once.",
        .0.join(", ")
    )]
    DuplicateTarget(Vec<String>),

    #[error(
        "Tool call(s) not found: {}. Make sure you're using the correct toolCallId from previous tool outputs.",
        .0.join(", ")
    )]
    TargetNotFound(Vec<String>),

    #[error(
        "Tool call id(s) appear on more than one tool part: {}. Release cannot tell which output to replace.",
        .0.join(", ")
    )]
    AmbiguousTarget(Vec<String>),

    #[error(
        "Cannot release tool call {call_id}: only completed tools can be released. Current status: {status}"
    )]
    TargetNotTerminal { call_id: String, status: ToolStatus },

    #[error(
        "Tool call {call_id} has already been released. You cannot release the same tool call twice."
    )]
    TargetAlreadyReleased { call_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_every_id() {
        let err = ReleaseError::TargetNotFound(vec!["fake-1".into(), "fake-2".into()]);
        let msg = err.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("fake-1, fake-2"));
        assert!(msg.contains("Make sure you're using the correct toolCallId"));
    }

    #[test]
    fn not_terminal_names_status() {
        let err = ReleaseError::TargetNotTerminal {
            call_id: "c1".into(),
            status: ToolStatus::Running,
        };
        assert_eq!(
            err.to_string(),
            "Cannot release tool call c1: only completed tools can be released. Current status: running"
        );
    }

    #[test]
    fn ambiguous_lists_ids() {
        let err = ReleaseError::AmbiguousTarget(vec!["X".into(), "Y".into()]);
        assert!(err.to_string().contains("more than one tool part: X, Y."));
    }

    #[test]
    fn duplicate_mentions_ids() {
        let err = ReleaseError::DuplicateTarget(vec!["c1".into()]);
        assert!(err.to_string().starts_with("Duplicate toolCallIds detected: c1."));
    }
}
