use snafu::OptionExt;

use super::error::{ChatResult, SessionNotFoundSnafu};
use super::ids::SessionId;
use super::types::{MessageLog, SessionEntry};

/// Ordered collection of all session threads created in the current run.
///
/// Entries are kept most-recently-created first; `push` prepends and the
/// order never changes afterwards, not even when an older session becomes
/// active again. The store is a passive mirror: the send pipeline mutates the
/// active log and reflects every change back through [`HistoryStore::sync`],
/// addressed by session id so a resolution arriving after the active session
/// changed cannot corrupt the wrong entry.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: Vec<SessionEntry>,
    current_id: Option<SessionId>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepends the entry and makes it the active session.
    pub fn push(&mut self, entry: SessionEntry) {
        self.current_id = Some(entry.id);
        self.entries.insert(0, entry);
    }

    /// Makes `session_id` the active session and returns a snapshot of its
    /// log for the caller to display.
    ///
    /// On failure the previously active session stays active.
    pub fn switch_to(&mut self, session_id: SessionId) -> ChatResult<MessageLog> {
        let entry = self.get(session_id).context(SessionNotFoundSnafu {
            stage: "switch-to-session",
            session_id,
        })?;
        let snapshot = entry.messages.clone();
        self.current_id = Some(session_id);
        Ok(snapshot)
    }

    /// Replaces the stored log of the entry matching `session_id`.
    ///
    /// All other entries and the collection order are left untouched.
    pub fn sync(&mut self, session_id: SessionId, messages: MessageLog) -> ChatResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == session_id)
            .context(SessionNotFoundSnafu {
                stage: "sync-session-log",
                session_id,
            })?;
        entry.messages = messages;
        Ok(())
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.current_id
    }

    pub fn current(&self) -> Option<&SessionEntry> {
        self.current_id.and_then(|id| self.get(id))
    }

    pub fn get(&self, session_id: SessionId) -> Option<&SessionEntry> {
        self.entries.iter().find(|entry| entry.id == session_id)
    }

    /// All sessions, most recently created first.
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
