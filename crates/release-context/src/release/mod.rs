//! Context release: replace completed tool outputs with compact placeholders.
//!
//! Tool results are the largest context consumer in an agent loop. Once the
//! model has used a result, the full text rarely matters again. Releasing a
//! call rewrites its stored output to a placeholder that keeps the title,
//! size, line count and token savings, so the conversation shape is
//! unchanged while the context shrinks.
//!
//! Each call to [`ContextReleaser::release`] runs one pipeline over a fresh
//! read of the session:
//!
//! 1. **[`select`]** picks the most recent releasable calls when the request
//!    names none.
//! 2. **[`validate`]** checks every target before anything is written.
//! 3. **[`extract`]** measures each output, per producer kind.
//! 4. The [`TokenEstimator`] prices the original output.
//! 5. **[`placeholder`]** renders the replacement, written through the
//!    [`ConversationStore`] one part at a time; **[`report`]** summarizes.
//!
//! Release is single-shot per call id: releasing a released call is an error,
//! never a silent no-op.

pub mod error;
pub mod extract;
pub mod placeholder;
pub mod report;
pub mod select;
pub mod validate;

use std::sync::Arc;

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

pub use error::ReleaseError;
pub use extract::{Extractor, ExtractorTable, ReleaseRecord};
pub use placeholder::{RELEASED_PREFIX, is_released, render_placeholder};
pub use report::{ReleaseMetadata, ReleaseOutcome, SkipCounts};

use crate::config::ReleaseConfig;
use crate::conversation::{CompletedState, Message, ToolPart, ToolStatus};
use crate::store::ConversationStore;
use crate::tokens::{ByteRatioEstimator, TokenEstimator};

// ── Request ────────────────────────────────────────────────────────

/// Parameters of a release call, as the model sends them.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    /// Tool call IDs to release. If omitted, the most recent completed tool
    /// calls are released.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(min = 1))]
    pub tool_call_ids: Option<Vec<String>>,
    /// Number of recent tool calls to release. Only used when toolCallIds is
    /// omitted. Default: 3.
    #[serde(
        default,
        deserialize_with = "deserialize_count",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<f64>")]
    pub count: Option<i64>,
    /// Only release calls from these tools (e.g. ["read", "grep"]). Only
    /// used when toolCallIds is omitted. Default: all tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

impl ReleaseRequest {
    /// Release the most recent completed calls.
    pub fn auto() -> Self {
        Self::default()
    }

    /// Release exactly these calls.
    pub fn calls<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool_call_ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Explicit targets, if any. An empty list counts as none.
    pub fn explicit_targets(&self) -> Option<&[String]> {
        self.tool_call_ids
            .as_deref()
            .filter(|ids| !ids.is_empty())
    }
}

/// Accepts integers and floats; fractions are truncated.
fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CountValue {
        I64(i64),
        F64(f64),
    }

    Ok(match Option::<CountValue>::deserialize(deserializer)? {
        None => None,
        Some(CountValue::I64(v)) => Some(v),
        Some(CountValue::F64(v)) => Some(v as i64),
    })
}

// ── Targets ────────────────────────────────────────────────────────

/// A completed, unreleased tool part chosen for release.
///
/// Carries the part itself rather than its call id, so the write goes to
/// exactly the part that was selected or validated.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseTarget<'a> {
    pub part: &'a ToolPart,
    pub state: &'a CompletedState,
}

impl ReleaseTarget<'_> {
    /// Copy of the part with its output replaced.
    pub fn with_output(&self, output: String) -> ToolPart {
        self.part.with_completed(CompletedState {
            output,
            ..self.state.clone()
        })
    }
}

// ── Inspection ─────────────────────────────────────────────────────

/// One tool call as seen by [`ContextReleaser::list_tool_calls`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallSummary {
    pub call_id: String,
    pub tool: String,
    pub title: String,
    pub status: ToolStatus,
    pub released: bool,
    /// Output size in bytes; 0 unless completed.
    pub output_bytes: usize,
    pub message_index: usize,
}

// ── ContextReleaser ────────────────────────────────────────────────

/// Runs the release pipeline against a [`ConversationStore`].
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(FileStore::new(".agents/sessions")?);
/// let releaser = ContextReleaser::new(store)
///     .with_config(ReleaseConfig::new().protect_tool("todo"));
///
/// let outcome = releaser
///     .release("ses_abc", &ReleaseRequest::auto().with_tools(["read"]))
///     .await?;
/// println!("{}", outcome.output);
/// ```
pub struct ContextReleaser {
    store: Arc<dyn ConversationStore>,
    estimator: Option<Arc<dyn TokenEstimator>>,
    extractors: ExtractorTable,
    config: ReleaseConfig,
}

impl ContextReleaser {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            estimator: None,
            extractors: ExtractorTable::default(),
            config: ReleaseConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReleaseConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom token estimator instead of the configured byte ratio.
    pub fn with_estimator(mut self, estimator: impl TokenEstimator + 'static) -> Self {
        self.estimator = Some(Arc::new(estimator));
        self
    }

    /// Register an extractor for a producer kind.
    pub fn with_extractor(
        mut self,
        kind: impl Into<String>,
        extractor: impl Extractor + 'static,
    ) -> Self {
        self.extractors.register(kind, extractor);
        self
    }

    fn estimate_tokens(&self, text: &str) -> usize {
        match &self.estimator {
            Some(estimator) => estimator.estimate(text),
            None => ByteRatioEstimator::new(self.config.bytes_per_token).estimate(text),
        }
    }

    /// Release tool outputs in a session.
    ///
    /// Validation covers the whole batch before the first write, so a
    /// rejected request leaves the session untouched. A store failure while
    /// writing aborts the call; parts already written stay released.
    pub async fn release(
        &self,
        session_id: &str,
        request: &ReleaseRequest,
    ) -> Result<ReleaseOutcome, ReleaseError> {
        let messages = self.store.list_messages(session_id).await?;

        let (targets, skipped) = match request.explicit_targets() {
            Some(ids) => (
                validate::validate_targets(&messages, ids)?,
                SkipCounts::default(),
            ),
            None => {
                let count = request.count.unwrap_or(self.config.default_count);
                let tools = request.tools.as_deref().unwrap_or_default();
                let selection = select::select_candidates(&messages, count, tools, &self.config);
                if selection.targets.is_empty() {
                    info!(
                        "[release] {session_id}: nothing to release ({} unfinished, {} already released)",
                        selection.skipped.not_terminal, selection.skipped.already_released,
                    );
                    return Ok(ReleaseOutcome::no_candidates(selection.skipped));
                }
                (selection.targets, selection.skipped)
            }
        };

        let mut planned = Vec::with_capacity(targets.len());
        let mut saved_tokens = 0;
        for target in targets {
            let mut record = self.extractors.extract(&target.part.tool, target.state);
            let tokens = self.estimate_tokens(&target.state.output);
            record.saved_tokens = Some(tokens);
            saved_tokens += tokens;
            planned.push((target, record));
        }

        let mut files = Vec::with_capacity(planned.len());
        for (target, record) in planned {
            let placeholder = render_placeholder(&target.part.tool, &record, Utc::now());
            self.store.update_part(target.with_output(placeholder)).await?;
            info!(
                "[release] {}({}) {} -> ~{} tokens freed",
                target.part.tool,
                target.part.call_id,
                record.path,
                record.saved_tokens.unwrap_or(0),
            );
            files.push(record);
        }

        debug!(
            "[release] {session_id}: {} call(s), ~{saved_tokens} tokens",
            files.len()
        );
        Ok(ReleaseOutcome::released(files, saved_tokens, skipped))
    }

    /// Every tool call in a session, oldest first.
    pub async fn list_tool_calls(
        &self,
        session_id: &str,
    ) -> Result<Vec<ToolCallSummary>, ReleaseError> {
        let messages = self.store.list_messages(session_id).await?;
        Ok(summarize_tool_calls(&messages))
    }
}

fn summarize_tool_calls(messages: &[Message]) -> Vec<ToolCallSummary> {
    let mut calls = Vec::new();
    for (message_index, message) in messages.iter().enumerate() {
        for part in message.tool_parts() {
            let completed = part.completed_state();
            calls.push(ToolCallSummary {
                call_id: part.call_id.clone(),
                tool: part.tool.clone(),
                title: completed.map(|c| c.title.clone()).unwrap_or_default(),
                status: part.state.status(),
                released: part.is_released(),
                output_bytes: completed.map_or(0, |c| c.output.len()),
                message_index,
            });
        }
    }
    calls
}
