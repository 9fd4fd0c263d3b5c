//! Conversation storage seam.
//!
//! The release pipeline reads a session's messages and writes back single
//! tool parts through [`ConversationStore`]. Hosts plug in their own session
//! database; this module also ships two implementations:
//!
//! - [`MemoryStore`] keeps conversations in a map. Used by tests and by hosts
//!   that own the message list in memory.
//! - [`FileStore`] keeps one pretty-printed JSON file per session under a
//!   directory:
//!
//! ```text
//! sessions_dir/
//!   ses_abc.json
//!   ses_def.json
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::conversation::{Conversation, Message, ToolPart};

/// Boxed future returned by [`ConversationStore`] methods.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),
    #[error("part {part_id} not found in message {message_id} of session {session_id}")]
    PartNotFound {
        session_id: String,
        message_id: String,
        part_id: String,
    },
    #[error("session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed session data: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Read and update access to conversation logs.
///
/// Uses boxed futures so that the trait is dyn-compatible.
pub trait ConversationStore: Send + Sync {
    /// Snapshot of a session's messages in conversation order.
    fn list_messages<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Vec<Message>>;

    /// Replace the stored part with the same session, message and part id.
    fn update_part(&self, part: ToolPart) -> StoreFuture<'_, ()>;
}

// ── MemoryStore ────────────────────────────────────────────────────

/// In-memory [`ConversationStore`].
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, Conversation>>,
    updates: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a conversation (builder pattern).
    pub fn with_conversation(self, conversation: Conversation) -> Self {
        self.insert(conversation);
        self
    }

    pub fn insert(&self, conversation: Conversation) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(conversation.id.clone(), conversation);
    }

    /// Clone of a stored conversation.
    pub fn snapshot(&self, session_id: &str) -> Option<Conversation> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(session_id).cloned()
    }

    /// Number of successful `update_part` calls so far.
    pub fn update_count(&self) -> usize {
        *self.updates.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConversationStore for MemoryStore {
    fn list_messages<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Vec<Message>> {
        Box::pin(async move {
            self.snapshot(session_id)
                .map(|c| c.messages)
                .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))
        })
    }

    fn update_part(&self, part: ToolPart) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            {
                let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
                let conversation = sessions
                    .get_mut(&part.session_id)
                    .ok_or_else(|| StoreError::SessionNotFound(part.session_id.clone()))?;
                if !conversation.replace_part(&part) {
                    return Err(part_not_found(&part));
                }
            }
            *self.updates.lock().unwrap_or_else(|e| e.into_inner()) += 1;
            Ok(())
        })
    }
}

// ── FileStore ──────────────────────────────────────────────────────

/// JSON-file [`ConversationStore`]: `{sessions_dir}/{session_id}.json`.
///
/// Updates are read-modify-write with an atomic rename. Concurrent writers
/// to the same session are not coordinated; the last rename wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    sessions_dir: PathBuf,
}

impl FileStore {
    /// Create a store, ensuring the sessions directory exists.
    pub fn new(sessions_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let sessions_dir = sessions_dir.into();
        std::fs::create_dir_all(&sessions_dir)?;
        Ok(Self { sessions_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !session_id.is_empty()
            && !session_id.starts_with('.')
            && !session_id.contains(['/', '\\']);
        if !valid {
            return Err(StoreError::InvalidSessionId(session_id.to_string()));
        }
        Ok(self.sessions_dir.join(format!("{session_id}.json")))
    }

    /// Load a conversation. Missing sessions are [`StoreError::SessionNotFound`].
    pub async fn load(&self, session_id: &str) -> Result<Conversation, StoreError> {
        let path = self.session_path(session_id)?;
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::SessionNotFound(session_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let conversation: Conversation = serde_json::from_str(&json)?;
        if conversation.id != session_id {
            warn!(
                "Session file {} declares id {:?}",
                path.display(),
                conversation.id
            );
        }
        Ok(conversation)
    }

    /// Atomic write: serialize to a temp file, then rename into place.
    pub async fn save(&self, conversation: &Conversation) -> Result<(), StoreError> {
        let path = self.session_path(&conversation.id)?;
        let tmp_path = self
            .sessions_dir
            .join(format!(".{}.json.tmp", conversation.id));

        let json = serde_json::to_string_pretty(conversation)?;
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        debug!("Saved session {} to {}", conversation.id, path.display());
        Ok(())
    }

    /// Ids of all sessions in the directory, sorted.
    pub async fn list_sessions(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.sessions_dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl ConversationStore for FileStore {
    fn list_messages<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Vec<Message>> {
        Box::pin(async move { Ok(self.load(session_id).await?.messages) })
    }

    fn update_part(&self, part: ToolPart) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut conversation = self.load(&part.session_id).await?;
            if !conversation.replace_part(&part) {
                return Err(part_not_found(&part));
            }
            self.save(&conversation).await
        })
    }
}

fn part_not_found(part: &ToolPart) -> StoreError {
    StoreError::PartNotFound {
        session_id: part.session_id.clone(),
        message_id: part.message_id.clone(),
        part_id: part.id.clone(),
    }
}
