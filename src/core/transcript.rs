//! The ordered conversation and the transitions stream events drive on it.

use chrono::Utc;

use crate::api::{ChatMessage, StreamEvent, StreamEventKind};
use crate::core::message::{Message, MessageId};

/// Whether a transition changed anything observers should hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Updated,
    Unchanged,
}

impl Transition {
    pub fn is_updated(self) -> bool {
        self == Transition::Updated
    }
}

/// A freshly appended user/assistant pair plus the history to send for it.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user_id: MessageId,
    pub assistant_id: MessageId,
    pub history: Vec<ChatMessage>,
}

pub fn format_error_annotation(content: &str) -> String {
    format!("\n\n*Error: {content}*")
}

#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    next_seq: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            next_seq: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| &message.id == id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.get(id).is_some()
    }

    fn next_id(&mut self) -> MessageId {
        let millis = Utc::now().timestamp_millis();
        loop {
            let id = MessageId::new(format!("msg_{millis}_{}", self.next_seq));
            self.next_seq += 1;
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// Append a user turn and its empty assistant reply in one step.
    ///
    /// The returned history is the transcript as it stood before the call
    /// plus the new user turn; the pending reply is never part of it.
    pub fn begin_exchange(&mut self, text: &str) -> Exchange {
        let user_id = self.next_id();
        let assistant_id = self.next_id();
        let user = Message::user(user_id.clone(), text);

        let mut history: Vec<ChatMessage> =
            self.messages.iter().map(Message::to_chat_message).collect();
        history.push(user.to_chat_message());

        self.messages.push(user);
        self.messages
            .push(Message::pending_assistant(assistant_id.clone()));

        Exchange {
            user_id,
            assistant_id,
            history,
        }
    }

    fn streaming_target(&mut self, target: &MessageId) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .find(|message| &message.id == target && message.is_assistant() && message.streaming)
    }

    /// Apply one stream event to the in-flight assistant reply.
    ///
    /// Only a streaming assistant message with the given id is touched.
    /// Kinds that arrive without their payload field, or with empty text,
    /// are no-ops.
    pub fn apply(&mut self, target: &MessageId, event: &StreamEvent) -> Transition {
        let Some(message) = self.streaming_target(target) else {
            return Transition::Unchanged;
        };

        match (event.kind, &event.content, &event.sources) {
            (StreamEventKind::Token, Some(content), _) if !content.is_empty() => {
                message.content.push_str(content);
                message.active_tools = None;
                Transition::Updated
            }
            (StreamEventKind::ToolCall, Some(name), _) if !name.is_empty() => {
                message
                    .active_tools
                    .get_or_insert_with(Vec::new)
                    .push(name.clone());
                Transition::Updated
            }
            (StreamEventKind::Sources, _, Some(sources)) => {
                message.sources = Some(
                    sources
                        .iter()
                        .filter(|source| source.is_valid())
                        .cloned()
                        .collect(),
                );
                Transition::Updated
            }
            (StreamEventKind::Done, _, _) => {
                message.active_tools = None;
                message.streaming = false;
                Transition::Updated
            }
            (StreamEventKind::Error, Some(content), _) if !content.is_empty() => {
                message.content.push_str(&format_error_annotation(content));
                Transition::Updated
            }
            _ => Transition::Unchanged,
        }
    }

    /// Close the reply without touching its content.
    pub fn finish(&mut self, target: &MessageId) -> Transition {
        match self.streaming_target(target) {
            Some(message) => {
                message.active_tools = None;
                message.streaming = false;
                Transition::Updated
            }
            None => Transition::Unchanged,
        }
    }

    /// Replace the reply with a fixed failure notice and close it.
    pub fn fail(&mut self, target: &MessageId, notice: &str) -> Transition {
        match self.streaming_target(target) {
            Some(message) => {
                message.content = notice.to_string();
                message.active_tools = None;
                message.streaming = false;
                Transition::Updated
            }
            None => Transition::Unchanged,
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
