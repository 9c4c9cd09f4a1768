use super::ids::{ExchangeId, SessionId};

/// Routing key for one send round-trip.
///
/// A resolution must name the exact target that started the exchange, so an
/// answer arriving after the active session changed still lands in the
/// session that asked the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeTarget {
    pub session_id: SessionId,
    pub exchange_id: ExchangeId,
}

impl ExchangeTarget {
    pub const fn new(session_id: SessionId, exchange_id: ExchangeId) -> Self {
        Self {
            session_id,
            exchange_id,
        }
    }
}

/// Per-session send lifecycle.
///
/// `Failed` is terminal for the turn only: a new exchange may begin from it,
/// so one failed request never wedges the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    AwaitingResponse(ExchangeTarget),
    Failed {
        target: ExchangeTarget,
        message: String,
    },
}

/// State transition input for the send lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTransition {
    Begin(ExchangeTarget),
    Complete(ExchangeTarget),
    Fail {
        target: ExchangeTarget,
        message: String,
    },
    Reset,
}

/// Rejection reason for illegal send transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendRejection {
    AlreadyAwaiting {
        active: ExchangeTarget,
        attempted: ExchangeTarget,
    },
    NoExchangeInFlight,
    ExchangeMismatch {
        active: ExchangeTarget,
        attempted: ExchangeTarget,
    },
}

pub type SendTransitionResult = Result<SendState, SendRejection>;

impl SendState {
    /// Returns the in-flight target if and only if a response is awaited.
    pub fn awaiting_target(&self) -> Option<ExchangeTarget> {
        match self {
            Self::AwaitingResponse(target) => Some(*target),
            Self::Idle | Self::Failed { .. } => None,
        }
    }

    /// True while the session has a request in flight (the typing state).
    pub fn is_awaiting(&self) -> bool {
        matches!(self, Self::AwaitingResponse(_))
    }

    /// Applies one transition deterministically.
    ///
    /// `Begin` is refused while any exchange is awaiting a response, which is
    /// what serializes sends per session. `Complete` and `Fail` must name the
    /// in-flight target exactly.
    pub fn apply(&self, transition: SendTransition) -> SendTransitionResult {
        match transition {
            SendTransition::Begin(target) => self.apply_begin(target),
            SendTransition::Complete(target) => self.apply_complete(target),
            SendTransition::Fail { target, message } => self.apply_fail(target, message),
            SendTransition::Reset => Ok(Self::Idle),
        }
    }

    fn apply_begin(&self, target: ExchangeTarget) -> SendTransitionResult {
        match self {
            Self::AwaitingResponse(active) => Err(SendRejection::AlreadyAwaiting {
                active: *active,
                attempted: target,
            }),
            Self::Idle | Self::Failed { .. } => Ok(Self::AwaitingResponse(target)),
        }
    }

    fn apply_complete(&self, target: ExchangeTarget) -> SendTransitionResult {
        match self {
            Self::AwaitingResponse(active) if *active == target => Ok(Self::Idle),
            Self::AwaitingResponse(active) => Err(SendRejection::ExchangeMismatch {
                active: *active,
                attempted: target,
            }),
            Self::Idle | Self::Failed { .. } => Err(SendRejection::NoExchangeInFlight),
        }
    }

    fn apply_fail(&self, target: ExchangeTarget, message: String) -> SendTransitionResult {
        match self {
            Self::AwaitingResponse(active) if *active == target => {
                Ok(Self::Failed { target, message })
            }
            Self::AwaitingResponse(active) => Err(SendRejection::ExchangeMismatch {
                active: *active,
                attempted: target,
            }),
            Self::Idle | Self::Failed { .. } => Err(SendRejection::NoExchangeInFlight),
        }
    }
}
