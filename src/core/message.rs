use serde::{Deserialize, Serialize};

use crate::api::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

/// Delivery state of a transcript entry.
///
/// `Pending` and `Streaming` are the in-progress states; a history holds at
/// most one message in either of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// User message appended before the server accepted the request.
    Pending,
    /// Assistant reply currently receiving chunks.
    Streaming,
    Complete,
    /// Reply stopped early; content is final but partial.
    Interrupted,
}

impl MessageState {
    pub fn is_in_progress(self) -> bool {
        matches!(self, MessageState::Pending | MessageState::Streaming)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub state: MessageState,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            state: MessageState::Complete,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            state: MessageState::Complete,
        }
    }

    pub fn to_api(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

/// Ordered conversation transcript.
///
/// Only the single in-progress message may change after it is appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
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

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn in_progress_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.state.is_in_progress())
            .count()
    }

    pub fn in_progress_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .position(|message| message.state.is_in_progress())
    }

    /// Appends a finished message (greetings, synthesized replies).
    pub fn push_complete(&mut self, message: Message) -> usize {
        debug_assert!(!message.state.is_in_progress());
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Appends the optimistic user message for a new submission.
    pub fn push_pending_user(&mut self, content: impl Into<String>) -> usize {
        debug_assert_eq!(self.in_progress_count(), 0);
        self.messages.push(Message {
            role: Role::User,
            content: content.into(),
            state: MessageState::Pending,
        });
        self.messages.len() - 1
    }

    /// Appends an empty assistant message to receive streamed text.
    pub fn begin_assistant(&mut self) -> usize {
        debug_assert_eq!(self.in_progress_count(), 0);
        self.messages.push(Message {
            role: Role::Assistant,
            content: String::new(),
            state: MessageState::Streaming,
        });
        self.messages.len() - 1
    }

    /// Appends text to the streaming message at `index`. Returns false when
    /// that message is not streaming.
    pub fn append_to(&mut self, index: usize, text: &str) -> bool {
        match self.messages.get_mut(index) {
            Some(message) if message.state == MessageState::Streaming => {
                message.content.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Moves the in-progress message at `index` into a final state.
    pub fn settle(&mut self, index: usize, state: MessageState) -> bool {
        debug_assert!(!state.is_in_progress());
        match self.messages.get_mut(index) {
            Some(message) if message.state.is_in_progress() => {
                message.state = state;
                true
            }
            _ => false,
        }
    }

    /// Wire form of every message before `end`.
    pub fn to_api_prefix(&self, end: usize) -> Vec<ChatMessage> {
        self.messages[..end.min(self.messages.len())]
            .iter()
            .map(Message::to_api)
            .collect()
    }
}
