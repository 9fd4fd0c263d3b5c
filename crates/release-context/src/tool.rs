//! The model-facing `release_context` tool.
//!
//! [`Tool`] is the function-calling seam: a static definition (name,
//! description, JSON schema) and an async `execute` that takes the raw JSON
//! arguments and returns the text handed back to the model. Failures are
//! returned as `"Error: ..."` strings so the model can correct itself.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::json_schema_for;
use crate::release::{ContextReleaser, ReleaseError, ReleaseOutcome, ReleaseRequest};

/// Name the tool is registered under.
pub const RELEASE_CONTEXT_TOOL: &str = "release_context";

pub const RELEASE_CONTEXT_DESCRIPTION: &str = "\
Release the output of completed tool calls from the conversation context to free up tokens. \
Each released output is replaced with a short placeholder recording what it was \
(title, line count, size, tokens saved).

Use this after you have finished working with large tool results (file reads, command \
output, search results) that you no longer need verbatim. Release is permanent: the \
original output cannot be recovered, so re-run the tool if you need it again.

- Pass toolCallIds to release specific calls.
- Omit toolCallIds to release the most recent completed calls; use count (default 3) \
and tools (e.g. [\"read\"]) to narrow the selection.
- Pending or running calls cannot be released, and a call can only be released once.";

/// Boxed future returned by [`Tool::execute`].
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = String> + Send + 'a>>;

// ── Definitions ────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

/// Tool definition in OpenAI function-calling format.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolDef {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

// ── Tool trait ─────────────────────────────────────────────────────

/// A tool an LLM agent can invoke via function-calling.
///
/// Uses a boxed future so that the trait is dyn-compatible.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDef;

    /// Execute with the raw JSON arguments string.
    fn execute(&self, arguments: &str) -> ToolFuture<'_>;

    fn name(&self) -> String {
        self.definition().function.name
    }
}

/// Validate tool-call arguments against the tool's JSON schema.
///
/// Returns `None` if valid, or `Some(error_string)` formatted for the model
/// to self-correct.
pub fn validate_tool_arguments(tool: &dyn Tool, arguments: &str) -> Option<String> {
    let args_value: serde_json::Value = match serde_json::from_str(arguments) {
        Ok(v) => v,
        Err(e) => {
            return Some(format!(
                "Error: invalid JSON arguments for tool '{}': {e}. \
                 Please provide valid JSON matching the tool's parameter schema.",
                tool.name()
            ));
        }
    };

    let schema = tool.definition().function.parameters;
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            warn!("Skipping argument validation for '{}': {e}", tool.name());
            return None;
        }
    };

    let errors: Vec<String> = validator
        .iter_errors(&args_value)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Error: argument validation failed for tool '{}':\n{}\n\
             Please fix the arguments and try again.",
            tool.name(),
            errors.join("\n")
        ))
    }
}

/// Deserialize tool arguments, mapping failures to a model-readable error.
pub fn parse_tool_args<T: serde::de::DeserializeOwned>(arguments: &str) -> Result<T, String> {
    serde_json::from_str(arguments).map_err(|e| {
        format!(
            "Error: invalid tool arguments: {e}. \
             Please provide valid JSON matching the tool's parameter schema."
        )
    })
}

// ── ReleaseContextTool ─────────────────────────────────────────────

/// `release_context` bound to one session.
///
/// # Example
///
/// ```ignore
/// let releaser = Arc::new(ContextReleaser::new(store));
/// let tool = ReleaseContextTool::new(releaser, "ses_abc").with_arg_validation(true);
/// let text = tool.execute(r#"{"tools": ["read"], "count": 2}"#).await;
/// ```
pub struct ReleaseContextTool {
    releaser: Arc<ContextReleaser>,
    session_id: String,
    validate_args: bool,
}

impl ReleaseContextTool {
    pub fn new(releaser: Arc<ContextReleaser>, session_id: impl Into<String>) -> Self {
        Self {
            releaser,
            session_id: session_id.into(),
            validate_args: false,
        }
    }

    /// Check arguments against the parameter schema before running.
    pub fn with_arg_validation(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    /// Run a parsed request and return the structured outcome.
    pub async fn run(&self, request: &ReleaseRequest) -> Result<ReleaseOutcome, ReleaseError> {
        self.releaser.release(&self.session_id, request).await
    }
}

impl Tool for ReleaseContextTool {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            RELEASE_CONTEXT_TOOL,
            RELEASE_CONTEXT_DESCRIPTION,
            json_schema_for::<ReleaseRequest>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = if arguments.trim().is_empty() {
            "{}".to_string()
        } else {
            arguments.to_string()
        };
        Box::pin(async move {
            if self.validate_args
                && let Some(err) = validate_tool_arguments(self, &arguments)
            {
                debug!(
                    "{RELEASE_CONTEXT_TOOL} rejected arguments for {}: {arguments}",
                    self.session_id
                );
                return err;
            }
            let request: ReleaseRequest = match parse_tool_args(&arguments) {
                Ok(r) => r,
                Err(e) => return e,
            };
            match self.run(&request).await {
                Ok(outcome) => outcome.output,
                Err(e) => format!("Error: {e}"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, Message, ToolPart};
    use crate::store::MemoryStore;

    fn tool(validate: bool) -> (ReleaseContextTool, Arc<MemoryStore>) {
        let conv = Conversation::new("ses_1").with_message(Message::assistant(
            "msg_1",
            vec![
                ToolPart::completed("ses_1", "c1", "read", "a.rs", "x".repeat(400)),
                ToolPart::running("ses_1", "r1", "bash"),
            ],
        ));
        let store = Arc::new(MemoryStore::new().with_conversation(conv));
        let releaser = Arc::new(ContextReleaser::new(store.clone()));
        (
            ReleaseContextTool::new(releaser, "ses_1").with_arg_validation(validate),
            store,
        )
    }

    #[test]
    fn definition_exposes_parameters() {
        let (tool, _) = tool(false);
        let def = tool.definition();
        assert_eq!(def.function.name, RELEASE_CONTEXT_TOOL);
        assert_eq!(tool.name(), "release_context");
        let props = &def.function.parameters["properties"];
        assert!(props.get("toolCallIds").is_some());
        assert!(props.get("count").is_some());
        assert!(props.get("tools").is_some());

        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["type"], "function");
    }

    #[test]
    fn schema_rejects_empty_and_non_string_ids() {
        let (tool, _) = tool(true);
        assert!(validate_tool_arguments(&tool, r#"{"toolCallIds": []}"#).is_some());
        let err = validate_tool_arguments(&tool, r#"{"toolCallIds": [1, 2]}"#).unwrap();
        assert!(err.contains("/toolCallIds/0"));
        assert!(validate_tool_arguments(&tool, r#"{"toolCallIds": ["c1"]}"#).is_none());
        assert!(validate_tool_arguments(&tool, "{}").is_none());
        assert!(validate_tool_arguments(&tool, "not json").unwrap().contains("invalid JSON"));
    }

    #[tokio::test]
    async fn execute_releases_and_summarizes() {
        let (tool, store) = tool(true);
        let out = tool.execute(r#"{"toolCallIds": ["c1"]}"#).await;
        assert!(out.starts_with("✅ Successfully released 1 tool call(s)"));
        assert!(out.contains("- a.rs"));
        assert!(out.contains("  Saved: ~100 tokens"));
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn execute_with_empty_arguments_auto_selects() {
        let (tool, store) = tool(false);
        let out = tool.execute("").await;
        assert!(out.contains("Successfully released 1 tool call(s)"));
        assert!(out.contains("Skipped 1 running tool(s)"));
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn execute_reports_errors_as_text() {
        let (tool, store) = tool(false);
        let out = tool.execute(r#"{"toolCallIds": ["r1"]}"#).await;
        assert!(out.starts_with("Error: Cannot release tool call r1"));

        let out = tool.execute(r#"{"toolCallIds": "c1"}"#).await;
        assert!(out.starts_with("Error: invalid tool arguments"));
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn validation_blocks_empty_id_list() {
        let (tool, store) = tool(true);
        let out = tool.execute(r#"{"toolCallIds": []}"#).await;
        assert!(out.starts_with("Error: argument validation failed"));
        assert_eq!(store.update_count(), 0);
    }
}
