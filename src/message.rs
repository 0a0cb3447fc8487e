//! Chat message data model.
//!
//! Messages are immutable once constructed. The caller supplies the full
//! conversation history on every request; nothing is retained between
//! requests.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Build the history actually handed to the provider: the caller's prior
/// turns plus the new user input appended as the final message.
pub fn assemble(history: Vec<Message>, user_input: &str) -> Vec<Message> {
    let mut assembled = history;
    assembled.push(Message::user(user_input));
    assembled
}
