pub mod error;
pub mod exchange;
pub mod history;
pub mod ids;
pub mod types;

pub use error::{ChatError, ChatResult};
pub use exchange::{
    ExchangeTarget, SendRejection, SendState, SendTransition, SendTransitionResult,
};
pub use history::HistoryStore;
pub use ids::{ExchangeId, SessionId};
pub use types::{DEFAULT_SESSION_TITLE, MessageLog, Role, SessionEntry, TITLE_WORD_LIMIT, Turn};
