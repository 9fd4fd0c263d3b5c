//! Release old tool results from an agent's conversation log.
//!
//! In a long agent session most of the context window is spent on tool
//! output the model has already consumed: file reads, command output, search
//! results. `release-context` lets the model (or the host) swap those outputs
//! for short placeholders that record what was there, freeing tokens for the
//! rest of the session while keeping the conversation structurally intact.
//!
//! # Getting started
//!
//! ```ignore
//! use std::sync::Arc;
//! use release_context::{ContextReleaser, FileStore, ReleaseContextTool, Tool};
//!
//! let store = Arc::new(FileStore::new(".sessions")?);
//! let releaser = Arc::new(ContextReleaser::new(store));
//!
//! // Expose it to the model as a function-calling tool.
//! let tool = ReleaseContextTool::new(releaser.clone(), "ses_abc");
//! let def = tool.definition();
//! let text = tool.execute(r#"{"toolCallIds": ["call_1", "call_2"]}"#).await;
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`conversation`] | Conversation log model: messages, parts, tool call states |
//! | [`store`] | [`ConversationStore`] seam with in-memory and JSON-file stores |
//! | [`release`] | Selection, validation, extraction, placeholders, summaries |
//! | [`tokens`] | Pluggable token estimation |
//! | [`config`] | [`ReleaseConfig`] defaults |
//! | [`tool`] | The `release_context` function-calling tool |

pub mod config;
pub mod conversation;
pub mod release;
pub mod store;
pub mod tokens;
pub mod tool;

pub use config::ReleaseConfig;
pub use conversation::{Conversation, Message, Part, ToolPart, ToolState, ToolStatus};
pub use release::{
    ContextReleaser, ReleaseError, ReleaseOutcome, ReleaseRecord, ReleaseRequest, SkipCounts,
    ToolCallSummary,
};
pub use store::{ConversationStore, FileStore, MemoryStore, StoreError};
pub use tokens::{ByteRatioEstimator, TokenEstimator};
pub use tool::{ReleaseContextTool, Tool, ToolDef};

/// Generate a JSON Schema `Value` from a type implementing [`schemars::JsonSchema`].
///
/// Used to build tool parameter schemas from the argument structs the tool
/// deserializes, so the two cannot drift apart.
///
/// ```
/// use release_context::{ReleaseRequest, json_schema_for};
///
/// let schema = json_schema_for::<ReleaseRequest>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["properties"]["toolCallIds"].is_object());
/// ```
pub fn json_schema_for<T: schemars::JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}
