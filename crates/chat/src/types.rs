use super::ids::SessionId;

/// Title shown for a session that has no user turn yet.
pub const DEFAULT_SESSION_TITLE: &str = "New conversation";

/// Maximum number of whitespace-separated words kept in a derived title.
pub const TITLE_WORD_LIMIT: usize = 10;

const TITLE_ELLIPSIS: char = '…';

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

/// One message exchanged in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Ordered sequence of turns for one session.
///
/// Append order is the only order; turns are never reordered or edited in
/// place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageLog {
    turns: Vec<Turn>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Returns the first user turn, the seed for the derived session title.
    pub fn first_user_turn(&self) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.role == Role::User)
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// One conversation thread: identifier, fixed topic, and its message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub id: SessionId,
    pub topic: String,
    pub messages: MessageLog,
}

impl SessionEntry {
    /// Creates a fresh session for a topic with an empty log.
    pub fn create(topic: impl Into<String>) -> Self {
        Self {
            id: SessionId::generate(),
            topic: topic.into(),
            messages: MessageLog::new(),
        }
    }

    /// Derives the display title from the first user turn.
    ///
    /// Pure projection of the log: recomputed on every call, never cached.
    /// The text is truncated to the first [`TITLE_WORD_LIMIT`] words with an
    /// ellipsis marker appended when anything was cut.
    pub fn derive_title(&self) -> String {
        let Some(seed) = self.messages.first_user_turn() else {
            return DEFAULT_SESSION_TITLE.to_string();
        };

        let words = seed.text.split_whitespace().collect::<Vec<_>>();
        let mut title = words
            .iter()
            .take(TITLE_WORD_LIMIT)
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        if words.len() > TITLE_WORD_LIMIT {
            title.push(TITLE_ELLIPSIS);
        }

        title
    }
}
