//! Session controller: sends a turn, streams the reply into the transcript
//! and keeps observers (persistence, rendering) in step with every change.

use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::api::{ChatMessage, ChatRequest, StreamEvent};
use crate::core::cancel::{CancelSlot, StreamTicket};
use crate::core::chat_stream::{parse_line, LineDecoder, ParsedLine};
use crate::core::message::{Message, MessageId};
use crate::core::transcript::{Transcript, Transition};


pub const CONNECTION_ERROR_MESSAGE: &str = "Error connecting to the server. Please try again.";
pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost. Please try again.";

/// Receives the transcript after every committed transition.
///
/// Observers run synchronously while the session is locked, so they see
/// transitions one at a time and in wire order.
pub trait TranscriptObserver: Send {
    fn transcript_changed(&mut self, transcript: &Transcript);

    fn transcript_reset(&mut self) {}
}

/// Why `send` refused to start a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    EmptyMessage,
    Busy,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::EmptyMessage => write!(f, "Message is empty"),
            SendError::Busy => write!(f, "A reply is still streaming; stop it first"),
        }
    }
}

impl StdError for SendError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The server closed the stream.
    Completed,
    /// `stop` or `reset` ended the stream early.
    Cancelled,
    /// The server answered without a usable streaming body.
    ConnectionFailed { status: Option<u16> },
    /// The transport failed before or during streaming.
    ConnectionLost,
}

struct SessionState {
    transcript: Transcript,
    loading: bool,
    cancel: CancelSlot,
    observers: Vec<Box<dyn TranscriptObserver>>,
}

impl SessionState {
    fn commit(&mut self, transition: Transition) {
        if transition.is_updated() {
            for observer in self.observers.iter_mut() {
                observer.transcript_changed(&self.transcript);
            }
        }
    }
}

struct SessionInner {
    client: reqwest::Client,
    chat_url: String,
    state: Mutex<SessionState>,
}

pub struct SessionBuilder {
    client: reqwest::Client,
    chat_url: String,
    messages: Vec<Message>,
    observers: Vec<Box<dyn TranscriptObserver>>,
}

impl SessionBuilder {
    /// Seed the transcript, typically with what the history store loaded.
    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn observer(mut self, observer: impl TranscriptObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn build(self) -> SessionController {
        SessionController {
            inner: Arc::new(SessionInner {
                client: self.client,
                chat_url: self.chat_url,
                state: Mutex::new(SessionState {
                    transcript: Transcript::from_messages(self.messages),
                    loading: false,
                    cancel: CancelSlot::new(),
                    observers: self.observers,
                }),
            }),
        }
    }
}

/// Cloneable handle to one conversation.
///
/// `send` drives a stream to completion; `stop` and `reset` may be called
/// from other tasks while it runs.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl SessionController {
    pub fn builder(client: reqwest::Client, chat_url: impl Into<String>) -> SessionBuilder {
        SessionBuilder {
            client,
            chat_url: chat_url.into(),
            messages: Vec::new(),
            observers: Vec::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn chat_url(&self) -> &str {
        &self.inner.chat_url
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().transcript.messages().to_vec()
    }

    pub fn with_transcript<R>(&self, f: impl FnOnce(&Transcript) -> R) -> R {
        f(&self.state().transcript)
    }

    /// Send one user turn and stream the reply into the transcript.
    ///
    /// Blank input and sends while another reply is loading are rejected
    /// without touching the transcript.
    pub async fn send(&self, text: &str) -> Result<StreamOutcome, SendError> {
        let (target, ticket, history) = self.begin(text)?;
        debug!(
            stream_id = ticket.stream_id,
            history_len = history.len(),
            url = %self.inner.chat_url,
            "Opening chat stream"
        );

        let outcome = self.run_stream(&target, &ticket, history).await;
        Ok(self.complete(&target, &ticket, outcome))
    }

    /// Abort the live stream, if any. The transcript is left as it is.
    pub fn stop(&self) -> bool {
        self.state().cancel.cancel()
    }

    /// Abort the live stream and forget the conversation, including its
    /// saved snapshot.
    pub fn reset(&self) {
        let mut state = self.state();
        state.cancel.cancel();
        state.transcript.clear();
        state.loading = false;
        for observer in state.observers.iter_mut() {
            observer.transcript_reset();
        }
        debug!("Session reset");
    }

    fn begin(&self, text: &str) -> Result<(MessageId, StreamTicket, Vec<ChatMessage>), SendError> {
        if text.trim().is_empty() {
            return Err(SendError::EmptyMessage);
        }

        let mut state = self.state();
        if state.loading {
            return Err(SendError::Busy);
        }

        let exchange = state.transcript.begin_exchange(text);
        state.loading = true;
        let ticket = state.cancel.begin();
        state.commit(Transition::Updated);

        Ok((exchange.assistant_id, ticket, exchange.history))
    }

    async fn run_stream(
        &self,
        target: &MessageId,
        ticket: &StreamTicket,
        history: Vec<ChatMessage>,
    ) -> StreamOutcome {
        let request = ChatRequest::streaming(history);
        let pending = self
            .inner
            .client
            .post(&self.inner.chat_url)
            .json(&request)
            .send();

        let response = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => return StreamOutcome::Cancelled,
            result = pending => result,
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(stream_id = ticket.stream_id, error = %err, "Chat request failed");
                return StreamOutcome::ConnectionLost;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(stream_id = ticket.stream_id, status = status.as_u16(), "Chat endpoint refused request");
            return StreamOutcome::ConnectionFailed {
                status: Some(status.as_u16()),
            };
        }

        let mut stream = response.bytes_stream();
        let mut decoder = LineDecoder::new();

        let outcome = 'read: loop {
            let next = tokio::select! {
                biased;
                _ = ticket.token.cancelled() => break 'read StreamOutcome::Cancelled,
                next = stream.next() => next,
            };

            match next {
                None => break 'read StreamOutcome::Completed,
                Some(Err(err)) => {
                    if ticket.token.is_cancelled() {
                        break 'read StreamOutcome::Cancelled;
                    }
                    warn!(stream_id = ticket.stream_id, error = %err, "Chat stream interrupted");
                    break 'read StreamOutcome::ConnectionLost;
                }
                Some(Ok(chunk)) => {
                    for line in decoder.push(&chunk) {
                        if let ParsedLine::Event(event) = parse_line(&line) {
                            if !self.apply_event(target, ticket, &event) {
                                break 'read StreamOutcome::Cancelled;
                            }
                        }
                    }
                }
            }
        };

        decoder.finish();
        outcome
    }

    /// Returns false once the stream has been cancelled; nothing is applied
    /// after that point.
    fn apply_event(&self, target: &MessageId, ticket: &StreamTicket, event: &StreamEvent) -> bool {
        let mut state = self.state();
        if ticket.token.is_cancelled() {
            return false;
        }
        let transition = state.transcript.apply(target, event);
        state.commit(transition);
        true
    }

    fn complete(
        &self,
        target: &MessageId,
        ticket: &StreamTicket,
        outcome: StreamOutcome,
    ) -> StreamOutcome {
        let mut state = self.state();

        let outcome = if ticket.token.is_cancelled() {
            StreamOutcome::Cancelled
        } else {
            outcome
        };

        let transition = match outcome {
            StreamOutcome::Completed | StreamOutcome::Cancelled => {
                state.transcript.finish(target)
            }
            StreamOutcome::ConnectionFailed { .. } => {
                state.transcript.fail(target, CONNECTION_ERROR_MESSAGE)
            }
            StreamOutcome::ConnectionLost => state.transcript.fail(target, CONNECTION_LOST_MESSAGE),
        };
        state.commit(transition);

        state.cancel.release(ticket.stream_id);
        if !state.cancel.is_active() {
            state.loading = false;
        }

        debug!(stream_id = ticket.stream_id, outcome = ?outcome, "Chat stream finished");
        outcome
    }
}
