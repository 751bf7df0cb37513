//! Chat history for one widget mount.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A single entry in the widget's history.
///
/// User content is plain text and is escaped when rendered. Assistant content
/// is an HTML fragment that has already been sanitised on the way in.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: u64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sender: Sender,
}

/// Append-only, insertion-ordered message list.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its id (previous id + 1, starting at 1).
    pub fn push(&mut self, sender: Sender, content: impl Into<String>) -> u64 {
        let id = self.messages.last().map_or(1, |m| m.id + 1);
        self.messages.push(ChatMessage {
            id,
            content: content.into(),
            timestamp: Utc::now(),
            sender,
        });
        id
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
