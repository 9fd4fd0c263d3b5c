//! Conversation log types: messages, parts, and tool-call state.
//!
//! The layout follows the session format written by the host agent. Each
//! [`Message`] carries an ordered list of [`Part`]s, and tool parts record the
//! call lifecycle in a `status`-tagged [`ToolState`]. Fields this crate does
//! not interpret are kept in `extra` maps (and unknown part kinds in
//! [`Part::Other`]) so a read/write cycle through a store never drops data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::release::placeholder::is_released;

// ── Conversation ───────────────────────────────────────────────────

/// One session's full message log.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Conversation {
    /// Session identifier.
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Session fields such as `title` or `time`, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Append a message (builder pattern).
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Replace the stored tool part with the same message and part id.
    ///
    /// Returns `false` when no such part exists; nothing is modified then.
    pub fn replace_part(&mut self, updated: &ToolPart) -> bool {
        let Some(message) = self
            .messages
            .iter_mut()
            .find(|m| m.id == updated.message_id)
        else {
            return false;
        };
        for part in &mut message.parts {
            if let Part::Tool(existing) = part
                && existing.id == updated.id
            {
                *existing = updated.clone();
                return true;
            }
        }
        false
    }
}

// ── Message ────────────────────────────────────────────────────────

/// Author of a message.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message in the conversation. Its index in [`Conversation::messages`]
/// is its recency: later index means more recent.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        let text = TextPart {
            id: format!("prt_{id}_text"),
            text: text.into(),
            extra: Map::new(),
        };
        Self {
            id,
            role: MessageRole::User,
            parts: vec![Part::Text(text)],
            extra: Map::new(),
        }
    }

    /// An assistant message holding the given tool parts. Each part's
    /// `message_id` is rewritten to this message's id.
    pub fn assistant(id: impl Into<String>, tool_parts: Vec<ToolPart>) -> Self {
        let id = id.into();
        let parts = tool_parts
            .into_iter()
            .map(|mut p| {
                p.message_id = id.clone();
                Part::Tool(p)
            })
            .collect();
        Self {
            id,
            role: MessageRole::Assistant,
            parts,
            extra: Map::new(),
        }
    }

    /// Iterate the tool parts of this message in order.
    pub fn tool_parts(&self) -> impl Iterator<Item = &ToolPart> {
        self.parts.iter().filter_map(|p| match p {
            Part::Tool(t) => Some(t),
            _ => None,
        })
    }
}

// ── Parts ──────────────────────────────────────────────────────────

/// A piece of message content. Only [`Part::Tool`] is inspected here.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text(TextPart),
    Tool(ToolPart),
    /// Any other part kind (reasoning, file, step markers, ...), kept verbatim.
    #[serde(untagged)]
    Other(Value),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TextPart {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A tool invocation and its current state.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolPart {
    /// Part identifier: the store's identity for updates.
    pub id: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "messageID")]
    pub message_id: String,
    /// Call identifier the model sees in tool results.
    #[serde(rename = "callID")]
    pub call_id: String,
    /// Producer kind: the tool name ("read", "bash", ...).
    pub tool: String,
    pub state: ToolState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolPart {
    fn with_state(
        session_id: impl Into<String>,
        call_id: impl Into<String>,
        tool: impl Into<String>,
        state: ToolState,
    ) -> Self {
        let call_id = call_id.into();
        Self {
            id: format!("prt_{call_id}"),
            session_id: session_id.into(),
            message_id: String::new(),
            call_id,
            tool: tool.into(),
            state,
            extra: Map::new(),
        }
    }

    /// A finished call with the given title and output.
    pub fn completed(
        session_id: impl Into<String>,
        call_id: impl Into<String>,
        tool: impl Into<String>,
        title: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        let state = ToolState::Completed(CompletedState {
            input: Value::Object(Map::new()),
            output: output.into(),
            title: title.into(),
            metadata: Value::Object(Map::new()),
            time: Some(ToolTime {
                start: 0,
                end: Some(0),
                compacted: None,
                extra: Map::new(),
            }),
            extra: Map::new(),
        });
        Self::with_state(session_id, call_id, tool, state)
    }

    pub fn running(
        session_id: impl Into<String>,
        call_id: impl Into<String>,
        tool: impl Into<String>,
    ) -> Self {
        let state = ToolState::Running(RunningState {
            input: Value::Object(Map::new()),
            title: None,
            extra: Map::new(),
        });
        Self::with_state(session_id, call_id, tool, state)
    }

    pub fn pending(
        session_id: impl Into<String>,
        call_id: impl Into<String>,
        tool: impl Into<String>,
    ) -> Self {
        let state = ToolState::Pending(PendingState {
            input: Value::Object(Map::new()),
            extra: Map::new(),
        });
        Self::with_state(session_id, call_id, tool, state)
    }

    pub fn failed(
        session_id: impl Into<String>,
        call_id: impl Into<String>,
        tool: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let state = ToolState::Error(ErrorState {
            input: Value::Object(Map::new()),
            error: error.into(),
            extra: Map::new(),
        });
        Self::with_state(session_id, call_id, tool, state)
    }

    /// The completed state, if the call finished successfully.
    pub fn completed_state(&self) -> Option<&CompletedState> {
        match &self.state {
            ToolState::Completed(c) => Some(c),
            _ => None,
        }
    }

    /// Whether the call completed and its output was already released.
    pub fn is_released(&self) -> bool {
        self.completed_state()
            .is_some_and(|c| is_released(&c.output))
    }

    /// Copy of this part in the given completed state. Every other field
    /// is carried over unchanged.
    pub fn with_completed(&self, state: CompletedState) -> ToolPart {
        ToolPart {
            state: ToolState::Completed(state),
            ..self.clone()
        }
    }
}

// ── Tool state ─────────────────────────────────────────────────────

/// Lifecycle state of a tool call: `pending`/`running` move to
/// `completed` or `error`, both terminal.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolState {
    Pending(PendingState),
    Running(RunningState),
    Completed(CompletedState),
    Error(ErrorState),
}

impl ToolState {
    pub fn status(&self) -> ToolStatus {
        match self {
            ToolState::Pending(_) => ToolStatus::Pending,
            ToolState::Running(_) => ToolStatus::Running,
            ToolState::Completed(_) => ToolStatus::Completed,
            ToolState::Error(_) => ToolStatus::Error,
        }
    }
}

/// The `status` tag of a [`ToolState`], without its payload.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Pending,
    Running,
    Completed,
    Error,
}

impl ToolStatus {
    /// `completed` and `error` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, ToolStatus::Completed | ToolStatus::Error)
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStatus::Pending => write!(f, "pending"),
            ToolStatus::Running => write!(f, "running"),
            ToolStatus::Completed => write!(f, "completed"),
            ToolStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PendingState {
    #[serde(default)]
    pub input: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunningState {
    #[serde(default)]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CompletedState {
    #[serde(default)]
    pub input: Value,
    pub output: String,
    /// Display title (for `read`, the file path).
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<ToolTime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorState {
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub error: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Epoch-millisecond timings of a completed call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ToolTime {
    pub start: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    /// Set by automatic pruning; renderers then hide the output entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compacted: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
