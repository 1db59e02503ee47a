//! Message and conversation-turn domain types.
//!
//! A [`Message`] is what the completion endpoint sees; a [`ConversationTurn`]
//! is what the daily log persists. Both are immutable value objects.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (persona, memory, stage instructions)
    System,
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in the dialogue presented to the model.
///
/// Ordering within a sequence is significant; fields are private so a
/// message cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// One logged exchange: the user's request and the final answer.
///
/// Written once, never mutated; identified by its position in the day's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Local>,
    pub request: String,
    pub response: String,
}

impl ConversationTurn {
    /// Create a turn stamped with the local clock.
    pub fn now(request: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            request: request.into(),
            response: response.into(),
        }
    }

    /// Expand into the user/assistant message pair it represents.
    pub fn to_messages(&self) -> [Message; 2] {
        [
            Message::user(self.request.clone()),
            Message::assistant(self.response.clone()),
        ]
    }
}
