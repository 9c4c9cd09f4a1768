use std::collections::HashMap;
use std::sync::Arc;

use snafu::{OptionExt, ResultExt, Snafu};

use norma_assistant::{AnswerEndpoint, AskRequest, AskResponse, EndpointError};
use norma_chat::{
    ChatError, ExchangeId, ExchangeTarget, HistoryStore, MessageLog, SendRejection, SendState,
    SendTransition, SessionEntry, SessionId, Turn,
};

/// Sidebar line for one session thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub is_active: bool,
    pub is_awaiting: bool,
}

/// Work order produced by [`ChatController::begin_exchange`]: the request to
/// issue against the answering service and the target to resolve afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeTicket {
    pub target: ExchangeTarget,
    pub request: AskRequest,
}

/// What a completed [`ChatController::send`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The question was whitespace-only; nothing was appended or sent.
    Ignored,
    /// The assistant turn was appended to the originating session.
    Answered,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PipelineError {
    #[snafu(display("no active session is selected"))]
    NoActiveSession { stage: &'static str },
    #[snafu(display("session '{session_id}' already has a request in flight"))]
    ExchangeInFlight {
        stage: &'static str,
        session_id: SessionId,
    },
    #[snafu(display("exchange resolution arrived out of order: {rejection:?}"))]
    ExchangeOutOfOrder {
        stage: &'static str,
        rejection: SendRejection,
    },
    #[snafu(display("chat history rejected `{stage}`, {source}"))]
    History {
        stage: &'static str,
        source: ChatError,
    },
    #[snafu(display("assistant request failed on `{stage}`, {source}"))]
    Ask {
        stage: &'static str,
        source: EndpointError,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Owns the session threads for one chosen topic and drives the send
/// round-trip against the answering service.
///
/// The controller keeps a working copy of the active session's log and
/// mirrors every mutation back into the [`HistoryStore`] through
/// `sync(session_id, log)`. Resolutions are addressed by [`ExchangeTarget`],
/// never by "whichever session is active", so switching threads while a
/// request is in flight cannot misattribute the answer. Sends are serialized
/// per session by the [`SendState`] machine; a second send while one is
/// awaiting a response is refused.
pub struct ChatController {
    endpoint: Arc<dyn AnswerEndpoint>,
    topic_id: String,
    history: HistoryStore,
    messages: MessageLog,
    send_states: HashMap<SessionId, SendState>,
    next_exchange_id: u64,
}

impl ChatController {
    /// Creates the controller with the first session already open, matching
    /// the client behavior of starting a conversation as soon as a topic is
    /// chosen.
    pub fn new(endpoint: Arc<dyn AnswerEndpoint>, topic_id: impl Into<String>) -> Self {
        let mut controller = Self {
            endpoint,
            topic_id: topic_id.into(),
            history: HistoryStore::new(),
            messages: MessageLog::new(),
            send_states: HashMap::new(),
            next_exchange_id: 1,
        };
        controller.new_chat();
        controller
    }

    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    /// The active session's log, for display.
    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub fn active_session_id(&self) -> Option<SessionId> {
        self.history.current_id()
    }

    /// True while `session_id` has a request in flight.
    pub fn is_awaiting(&self, session_id: SessionId) -> bool {
        self.send_states
            .get(&session_id)
            .is_some_and(SendState::is_awaiting)
    }

    /// Typing state of the active session.
    pub fn active_is_awaiting(&self) -> bool {
        self.history
            .current_id()
            .is_some_and(|session_id| self.is_awaiting(session_id))
    }

    /// Sessions in creation order (newest first) with their derived titles.
    pub fn session_summaries(&self) -> Vec<SessionSummary> {
        let current_id = self.history.current_id();
        self.history
            .entries()
            .iter()
            .map(|entry| SessionSummary {
                id: entry.id,
                title: entry.derive_title(),
                is_active: current_id == Some(entry.id),
                is_awaiting: self.is_awaiting(entry.id),
            })
            .collect()
    }

    /// Starts an empty session for the controller's topic and makes it
    /// active.
    pub fn new_chat(&mut self) -> SessionId {
        let entry = SessionEntry::create(self.topic_id.clone());
        let session_id = entry.id;
        self.history.push(entry);
        self.messages = MessageLog::new();
        tracing::debug!(session_id = %session_id, topic = %self.topic_id, "chat session created");
        session_id
    }

    /// Makes an existing session active and adopts its log snapshot.
    ///
    /// An unknown id is reported and leaves the active session unchanged. An
    /// in-flight request of the previous session keeps running.
    pub fn open_chat(&mut self, session_id: SessionId) -> PipelineResult<()> {
        let snapshot = self
            .history
            .switch_to(session_id)
            .context(HistorySnafu { stage: "open-chat" })?;
        self.messages = snapshot;
        Ok(())
    }

    /// First half of one send round-trip.
    ///
    /// Trims the question; whitespace-only input is a no-op returning
    /// `Ok(None)`. Otherwise the user turn is appended and mirrored into the
    /// store before any network traffic, the session is marked awaiting, and
    /// the ticket to issue is returned.
    pub fn begin_exchange(&mut self, question: &str) -> PipelineResult<Option<ExchangeTicket>> {
        let question = question.trim();
        if question.is_empty() {
            tracing::debug!("ignoring whitespace-only question");
            return Ok(None);
        }

        let session_id = self.history.current_id().context(NoActiveSessionSnafu {
            stage: "begin-exchange",
        })?;
        let topic = self
            .history
            .current()
            .map(|entry| entry.topic.clone())
            .context(NoActiveSessionSnafu {
                stage: "begin-exchange-topic",
            })?;

        let target = ExchangeTarget::new(session_id, ExchangeId::new(self.next_exchange_id));
        let state = self
            .send_states
            .get(&session_id)
            .cloned()
            .unwrap_or_default();
        let awaiting = state
            .apply(SendTransition::Begin(target))
            .map_err(|rejection| match rejection {
                SendRejection::AlreadyAwaiting { .. } => PipelineError::ExchangeInFlight {
                    stage: "begin-exchange",
                    session_id,
                },
                rejection => PipelineError::ExchangeOutOfOrder {
                    stage: "begin-exchange",
                    rejection,
                },
            })?;
        self.next_exchange_id += 1;

        // Optimistic append: the user turn is visible before the round-trip
        // completes, and the synced store updates the derived title at once.
        self.messages.append(Turn::user(question));
        self.history
            .sync(session_id, self.messages.clone())
            .context(HistorySnafu {
                stage: "sync-user-turn",
            })?;
        self.send_states.insert(session_id, awaiting);

        tracing::debug!(
            session_id = %session_id,
            exchange_id = %target.exchange_id,
            "exchange started"
        );
        Ok(Some(ExchangeTicket {
            target,
            request: AskRequest::new(topic, question),
        }))
    }

    /// Second half of one send round-trip.
    ///
    /// The outcome is applied to the session named by `target`, which may no
    /// longer be the active one. A failed request leaves the log without an
    /// assistant turn: the response is discarded, the session transitions to
    /// `Failed`, and the error is surfaced to the caller.
    pub fn resolve_exchange(
        &mut self,
        target: ExchangeTarget,
        outcome: Result<AskResponse, EndpointError>,
    ) -> PipelineResult<()> {
        let session_id = target.session_id;
        let state = self
            .send_states
            .get(&session_id)
            .cloned()
            .unwrap_or_default();

        match outcome {
            Ok(response) => {
                let next = state
                    .apply(SendTransition::Complete(target))
                    .map_err(|rejection| PipelineError::ExchangeOutOfOrder {
                        stage: "resolve-exchange",
                        rejection,
                    })?;

                if self.history.current_id() == Some(session_id) {
                    self.messages.append(Turn::assistant(response.answer));
                    self.history
                        .sync(session_id, self.messages.clone())
                        .context(HistorySnafu {
                            stage: "sync-assistant-turn",
                        })?;
                } else {
                    // The user switched away mid-flight; the answer still
                    // belongs to the session that asked.
                    let Some(entry) = self.history.get(session_id) else {
                        return Err(PipelineError::History {
                            stage: "resolve-exchange",
                            source: ChatError::SessionNotFound {
                                stage: "lookup-origin-session",
                                session_id,
                            },
                        });
                    };
                    let mut log = entry.messages.clone();
                    log.append(Turn::assistant(response.answer));
                    self.history
                        .sync(session_id, log)
                        .context(HistorySnafu {
                            stage: "sync-assistant-turn",
                        })?;
                }

                self.send_states.insert(session_id, next);
                tracing::debug!(
                    session_id = %session_id,
                    exchange_id = %target.exchange_id,
                    "exchange completed"
                );
                Ok(())
            }
            Err(source) => {
                let next = state
                    .apply(SendTransition::Fail {
                        target,
                        message: source.to_string(),
                    })
                    .map_err(|rejection| PipelineError::ExchangeOutOfOrder {
                        stage: "resolve-exchange",
                        rejection,
                    })?;
                self.send_states.insert(session_id, next);
                tracing::warn!(
                    session_id = %session_id,
                    exchange_id = %target.exchange_id,
                    error = %source,
                    "assistant request failed; response slot left empty"
                );
                Err(PipelineError::Ask {
                    stage: "resolve-exchange",
                    source,
                })
            }
        }
    }

    /// One full send round-trip against the answering service.
    pub async fn send(&mut self, question: &str) -> PipelineResult<SendOutcome> {
        let Some(ticket) = self.begin_exchange(question)? else {
            return Ok(SendOutcome::Ignored);
        };

        let ExchangeTicket { target, request } = ticket;
        let endpoint = Arc::clone(&self.endpoint);
        let outcome = endpoint.ask(request).await;
        self.resolve_exchange(target, outcome)?;
        Ok(SendOutcome::Answered)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use norma_assistant::{BoxFuture, EndpointResult};
    use norma_chat::{DEFAULT_SESSION_TITLE, Role};

    use super::*;

    /// Endpoint double that replays scripted outcomes and records requests.
    struct ScriptedEndpoint {
        replies: Mutex<VecDeque<EndpointResult<AskResponse>>>,
        seen: Mutex<Vec<AskRequest>>,
    }

    impl ScriptedEndpoint {
        fn with_replies(replies: Vec<EndpointResult<AskResponse>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn answering(answer: &str) -> Arc<Self> {
            Self::with_replies(vec![Ok(AskResponse {
                answer: answer.to_string(),
            })])
        }

        fn failing() -> Arc<Self> {
            Self::with_replies(vec![Err(EndpointError::UnexpectedStatus {
                stage: "ask-http-status",
                status: 500,
                body: "retrieval backend down".to_string(),
            })])
        }

        fn requests(&self) -> Vec<AskRequest> {
            self.seen.lock().expect("request mutex").clone()
        }
    }

    impl AnswerEndpoint for ScriptedEndpoint {
        fn ask<'a>(&'a self, request: AskRequest) -> BoxFuture<'a, EndpointResult<AskResponse>> {
            Box::pin(async move {
                self.seen.lock().expect("request mutex").push(request);
                self.replies
                    .lock()
                    .expect("reply mutex")
                    .pop_front()
                    .unwrap_or_else(|| {
                        Ok(AskResponse {
                            answer: "unscripted".to_string(),
                        })
                    })
            })
        }
    }

    fn controller_with(endpoint: Arc<ScriptedEndpoint>) -> ChatController {
        ChatController::new(endpoint, "constitucion_vs")
    }

    #[tokio::test]
    async fn send_round_trip_appends_both_turns() {
        let endpoint = ScriptedEndpoint::answering("Due process means...");
        let mut controller = controller_with(Arc::clone(&endpoint));

        let outcome = controller
            .send("What is due process?")
            .await
            .expect("send succeeds");
        assert_eq!(outcome, SendOutcome::Answered);
        assert!(!controller.active_is_awaiting());

        let turns = controller.messages().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "What is due process?");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text, "Due process means...");

        let requests = endpoint.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].topic, "constitucion_vs");
        assert_eq!(requests[0].question, "What is due process?");
    }

    #[tokio::test]
    async fn whitespace_only_question_is_a_silent_no_op() {
        let endpoint = ScriptedEndpoint::answering("never used");
        let mut controller = controller_with(Arc::clone(&endpoint));

        let outcome = controller.send("   \t  ").await.expect("no-op succeeds");
        assert_eq!(outcome, SendOutcome::Ignored);
        assert!(controller.messages().is_empty());
        assert!(!controller.active_is_awaiting());
        assert!(endpoint.requests().is_empty());
    }

    #[test]
    fn user_turn_is_visible_before_the_round_trip_completes() {
        let endpoint = ScriptedEndpoint::answering("pending");
        let mut controller = controller_with(endpoint);

        let ticket = controller
            .begin_exchange("  May an employer withhold wages?  ")
            .expect("exchange begins")
            .expect("non-empty question");

        // Optimistic append, trimmed, and mirrored into the store.
        assert_eq!(controller.messages().len(), 1);
        assert_eq!(
            controller.messages().turns()[0].text,
            "May an employer withhold wages?"
        );
        assert!(controller.active_is_awaiting());
        assert_eq!(ticket.request.question, "May an employer withhold wages?");

        let summaries = controller.session_summaries();
        assert_eq!(summaries[0].title, "May an employer withhold wages?");
        assert!(summaries[0].is_awaiting);
    }

    #[test]
    fn second_send_while_awaiting_is_refused() {
        let endpoint = ScriptedEndpoint::answering("slow answer");
        let mut controller = controller_with(endpoint);

        controller
            .begin_exchange("first question")
            .expect("exchange begins");

        let error = controller
            .begin_exchange("second question")
            .expect_err("concurrent send must be refused");
        assert!(matches!(error, PipelineError::ExchangeInFlight { .. }));

        // The refused question appended nothing.
        assert_eq!(controller.messages().len(), 1);
    }

    #[test]
    fn resolution_lands_in_the_originating_session_after_a_switch() {
        let endpoint = ScriptedEndpoint::answering("unused");
        let mut controller = controller_with(endpoint);
        let first_session = controller.active_session_id().expect("initial session");

        let ticket = controller
            .begin_exchange("what does article 53 guarantee?")
            .expect("exchange begins")
            .expect("non-empty question");

        // Switch away while the request is in flight.
        let second_session = controller.new_chat();
        assert!(controller.messages().is_empty());
        assert!(controller.is_awaiting(first_session));
        assert!(!controller.is_awaiting(second_session));

        controller
            .resolve_exchange(
                ticket.target,
                Ok(AskResponse {
                    answer: "minimum labor guarantees".to_string(),
                }),
            )
            .expect("resolution applies");

        // The answer landed in the first session, not the active one.
        assert!(controller.messages().is_empty());
        let first_entry = controller
            .session_summaries()
            .into_iter()
            .find(|summary| summary.id == first_session)
            .expect("first session listed");
        assert_eq!(first_entry.title, "what does article 53 guarantee?");
        assert!(!controller.is_awaiting(first_session));

        // Reopening shows both turns.
        controller.open_chat(first_session).expect("session exists");
        let turns = controller.messages().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, "minimum labor guarantees");
    }

    #[test]
    fn stale_resolution_is_rejected_without_touching_the_log() {
        let endpoint = ScriptedEndpoint::answering("unused");
        let mut controller = controller_with(endpoint);

        let ticket = controller
            .begin_exchange("real question")
            .expect("exchange begins")
            .expect("non-empty question");
        let stale = ExchangeTarget::new(ticket.target.session_id, ExchangeId::new(999));

        let error = controller
            .resolve_exchange(
                stale,
                Ok(AskResponse {
                    answer: "misrouted".to_string(),
                }),
            )
            .expect_err("stale resolution must be rejected");
        assert!(matches!(error, PipelineError::ExchangeOutOfOrder { .. }));
        assert_eq!(controller.messages().len(), 1);
        assert!(controller.active_is_awaiting());
    }

    #[tokio::test]
    async fn endpoint_failure_surfaces_and_frees_the_session() {
        let endpoint = ScriptedEndpoint::failing();
        let mut controller = controller_with(endpoint);

        let error = controller
            .send("will this fail?")
            .await
            .expect_err("endpoint failure surfaces");
        assert!(matches!(error, PipelineError::Ask { .. }));

        // The user turn stays, no assistant turn was appended, and the
        // session accepts the next send.
        assert_eq!(controller.messages().len(), 1);
        assert!(!controller.active_is_awaiting());

        let outcome = controller
            .send("second attempt")
            .await
            .expect("session is not wedged");
        assert_eq!(outcome, SendOutcome::Answered);
    }

    #[test]
    fn open_chat_with_unknown_id_keeps_the_active_session() {
        let endpoint = ScriptedEndpoint::answering("unused");
        let mut controller = controller_with(endpoint);
        let active = controller.active_session_id();

        let error = controller
            .open_chat(SessionId::generate())
            .expect_err("unknown session is reported");
        assert!(matches!(
            error,
            PipelineError::History {
                source: ChatError::SessionNotFound { .. },
                ..
            }
        ));
        assert_eq!(controller.active_session_id(), active);
    }

    #[tokio::test]
    async fn history_keeps_creation_order_and_fresh_titles() {
        let endpoint = ScriptedEndpoint::answering("Habeas corpus protects...");
        let mut controller = controller_with(Arc::clone(&endpoint));
        let first_session = controller.active_session_id().expect("initial session");

        controller
            .send("What is habeas corpus?")
            .await
            .expect("send succeeds");

        let second_session = controller.new_chat();
        let summaries = controller.session_summaries();
        assert_eq!(summaries.len(), 2);
        // Newest first; the empty session carries the placeholder title.
        assert_eq!(summaries[0].id, second_session);
        assert_eq!(summaries[0].title, DEFAULT_SESSION_TITLE);
        assert!(summaries[0].is_active);
        assert_eq!(summaries[1].id, first_session);
        assert_eq!(summaries[1].title, "What is habeas corpus?");

        // Opening the older session does not reorder the list.
        controller.open_chat(first_session).expect("session exists");
        let summaries = controller.session_summaries();
        assert_eq!(summaries[0].id, second_session);
        assert!(!summaries[0].is_active);
        assert!(summaries[1].is_active);
    }
}
