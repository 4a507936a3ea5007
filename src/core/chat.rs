//! Conversation engine: submits questions and materializes streamed replies.
//!
//! A [`ChatStore`] is a cheap handle over shared state. The state lock is only
//! held for synchronous mutations between suspension points (waiting for
//! response headers, waiting for each chunk), so observers can snapshot the
//! history while a reply is streaming.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::api::{ApiContext, ChatBackend, ChatRequest, Credential};
use crate::core::chat_stream::{consume_stream, StreamEnd, StreamOptions};
use crate::core::constants::{CHAT_ERROR_REPLY, STREAM_INTERRUPTED_MARKER};
use crate::core::message::{History, Message, MessageState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another submission is still in flight.
    Busy,
    /// The question was empty or whitespace.
    EmptyInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptReason {
    ReadFailed,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The reply streamed to completion.
    Completed,
    /// The request failed before streaming; an apology reply was appended.
    Failed,
    /// The reply stopped early; partial content was kept.
    Interrupted(InterruptReason),
    /// Nothing was sent and the history is unchanged.
    Rejected(Rejection),
}

/// Notifications emitted while a submission progresses. Rejected
/// submissions emit nothing, so every event belongs to the accepted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    UserMessageAppended { index: usize },
    ReplyStarted { index: usize },
    ReplyChunk { index: usize, text: String },
    Finished { outcome: SubmitOutcome },
}

#[derive(Debug)]
struct ChatState {
    context: ApiContext,
    history: History,
    is_loading: bool,
    cancel: Option<CancellationToken>,
}

#[derive(Clone)]
pub struct ChatStore {
    backend: Arc<dyn ChatBackend>,
    state: Arc<Mutex<ChatState>>,
    options: StreamOptions,
    events: Option<mpsc::UnboundedSender<ChatEvent>>,
}

/// Clears the busy flag when a submission ends, however it ends. If the
/// submission future is dropped mid-flight, the in-progress message is
/// settled as interrupted so the history invariant still holds.
struct SubmissionGuard {
    state: Arc<Mutex<ChatState>>,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = state.history.in_progress_index() {
            warn!(index, "submission abandoned with a message still in progress");
            let settled = match state.history.messages()[index].state {
                MessageState::Pending => MessageState::Complete,
                _ => MessageState::Interrupted,
            };
            state.history.settle(index, settled);
        }
        state.is_loading = false;
        state.cancel = None;
    }
}

struct Submission {
    context: ApiContext,
    request: ChatRequest,
    user_index: usize,
    cancel: CancellationToken,
    _guard: SubmissionGuard,
}

impl ChatStore {
    pub fn new(backend: Arc<dyn ChatBackend>, context: ApiContext) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(ChatState {
                context,
                history: History::new(),
                is_loading: false,
                cancel: None,
            })),
            options: StreamOptions::default(),
            events: None,
        }
    }

    /// Seeds the transcript with an opening assistant message. It is part of
    /// the history sent with later questions.
    pub fn with_greeting(self, greeting: impl Into<String>) -> Self {
        self.lock().history.push_complete(Message::assistant(greeting));
        self
    }

    pub fn with_stream_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<ChatEvent>) -> Self {
        self.events = Some(events);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ChatEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    pub fn history(&self) -> History {
        self.lock().history.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    pub fn context(&self) -> ApiContext {
        self.lock().context.clone()
    }

    /// Replaces the credential used by later submissions.
    pub fn set_credential(&self, credential: Credential) {
        let mut state = self.lock();
        state.context = state.context.with_credential(credential);
    }

    /// Cancels the in-flight submission, if any. Partial reply text is kept.
    pub fn cancel_current(&self) -> bool {
        match &self.lock().cancel {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn begin(&self, question: &str) -> Result<Submission, Rejection> {
        if question.trim().is_empty() {
            return Err(Rejection::EmptyInput);
        }

        let mut state = self.lock();
        if state.is_loading {
            return Err(Rejection::Busy);
        }

        let history = state.history.to_api_prefix(state.history.len());
        let user_index = state.history.push_pending_user(question);
        let cancel = CancellationToken::new();
        state.is_loading = true;
        state.cancel = Some(cancel.clone());

        Ok(Submission {
            context: state.context.clone(),
            request: ChatRequest {
                question: question.to_string(),
                history,
            },
            user_index,
            cancel,
            _guard: SubmissionGuard {
                state: Arc::clone(&self.state),
            },
        })
    }

    /// Sends `question` with the current history and streams the reply into
    /// the transcript.
    ///
    /// Failures never escape: they are logged and reflected in the history
    /// and the returned outcome.
    pub async fn send_message(&self, question: &str) -> SubmitOutcome {
        let submission = match self.begin(question) {
            Ok(submission) => submission,
            Err(rejection) => {
                debug!(?rejection, "chat submission rejected");
                return SubmitOutcome::Rejected(rejection);
            }
        };
        self.emit(ChatEvent::UserMessageAppended {
            index: submission.user_index,
        });

        let outcome = self.run(&submission).await;
        drop(submission);
        self.emit(ChatEvent::Finished { outcome });
        outcome
    }

    async fn run(&self, submission: &Submission) -> SubmitOutcome {
        let opened = tokio::select! {
            biased;
            _ = submission.cancel.cancelled() => None,
            result = self.backend.open_chat(&submission.context, &submission.request) => Some(result),
        };

        let stream = match opened {
            None => {
                self.lock()
                    .history
                    .settle(submission.user_index, MessageState::Complete);
                return SubmitOutcome::Interrupted(InterruptReason::Cancelled);
            }
            Some(Err(err)) => {
                error!(error = %err, "chat request failed");
                let mut state = self.lock();
                state
                    .history
                    .settle(submission.user_index, MessageState::Complete);
                state
                    .history
                    .push_complete(Message::assistant(CHAT_ERROR_REPLY));
                return SubmitOutcome::Failed;
            }
            Some(Ok(stream)) => stream,
        };

        let reply_index = {
            let mut state = self.lock();
            state
                .history
                .settle(submission.user_index, MessageState::Complete);
            state.history.begin_assistant()
        };
        self.emit(ChatEvent::ReplyStarted { index: reply_index });

        let end = consume_stream(stream, &self.options, &submission.cancel, |text| {
            self.lock().history.append_to(reply_index, text);
            self.emit(ChatEvent::ReplyChunk {
                index: reply_index,
                text: text.to_string(),
            });
        })
        .await;

        let (state, marker, outcome) = match end {
            StreamEnd::Completed => (MessageState::Complete, None, SubmitOutcome::Completed),
            StreamEnd::ReadFailed(err) => {
                error!(error = %err, "chat stream failed mid-reply");
                (
                    MessageState::Interrupted,
                    Some(STREAM_INTERRUPTED_MARKER),
                    SubmitOutcome::Interrupted(InterruptReason::ReadFailed),
                )
            }
            StreamEnd::TimedOut(limit) => {
                error!(?limit, "chat stream went idle");
                (
                    MessageState::Interrupted,
                    Some(STREAM_INTERRUPTED_MARKER),
                    SubmitOutcome::Interrupted(InterruptReason::TimedOut),
                )
            }
            StreamEnd::Cancelled => {
                debug!("chat stream cancelled");
                (
                    MessageState::Interrupted,
                    None,
                    SubmitOutcome::Interrupted(InterruptReason::Cancelled),
                )
            }
        };

        let mut guard = self.lock();
        if let Some(marker) = marker {
            guard.history.append_to(reply_index, marker);
        }
        guard.history.settle(reply_index, state);
        outcome
    }
}
