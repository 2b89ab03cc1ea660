//! Conversation turn primitives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant response
    Assistant,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,
    /// Turn role
    pub role: Role,
    /// Turn text
    pub text: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, append-only conversation history for a session.
///
/// Turns can only be appended; nothing in the API removes or reorders
/// recorded turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to the history.
    pub fn push(&mut self, message: Message) {
        self.turns.push(message);
    }

    /// All turns in order.
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Number of recorded turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the conversation has no turns yet.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent turn, if any.
    pub fn last(&self) -> Option<&Message> {
        self.turns.last()
    }

    /// The most recent `n` turns in chronological order.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_is_append_only_and_ordered() {
        let mut convo = Conversation::new();
        convo.push(Message::user("get Phoenix status"));
        convo.push(Message::assistant("Phoenix is on track."));
        convo.push(Message::user("thanks"));

        assert_eq!(convo.len(), 3);
        assert_eq!(convo.turns()[0].role, Role::User);
        assert_eq!(convo.turns()[1].role, Role::Assistant);
        assert_eq!(convo.turns()[2].text, "thanks");
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let mut convo = Conversation::new();
        for i in 0..5 {
            convo.push(Message::user(format!("turn {i}")));
        }

        let recent = convo.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "turn 3");
        assert_eq!(recent[1].text, "turn 4");
    }

    #[test]
    fn test_recent_handles_short_history() {
        let mut convo = Conversation::new();
        convo.push(Message::user("only turn"));
        assert_eq!(convo.recent(10).len(), 1);
    }
}
