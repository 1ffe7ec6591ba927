//! Chat messages and turns.
//!
//! A [`ChatTurn`] is what a client submits; a [`ChatMessage`] is what the
//! persistence layer records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The generated side of the conversation.
    Assistant,
}

impl Role {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::error::StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(crate::error::StorageError::UnknownRole(other.to_string())),
        }
    }
}

/// One prior turn as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMessage {
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl TurnMessage {
    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat request: an owner and the conversation so far.
///
/// The last message is the prompt sent to the generator. Fields are private
/// so a built turn always holds a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    owner_id: String,
    earlier: Vec<TurnMessage>,
    prompt: TurnMessage,
}

impl ChatTurn {
    /// Builds a turn, returning `None` when the owner or the message list is
    /// empty.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, mut messages: Vec<TurnMessage>) -> Option<Self> {
        let owner_id = owner_id.into();
        if owner_id.trim().is_empty() {
            return None;
        }
        let prompt = messages.pop()?;
        Some(Self {
            owner_id,
            earlier: messages,
            prompt,
        })
    }

    /// Builds a single-prompt turn.
    #[must_use]
    pub fn prompt(owner_id: impl Into<String>, prompt: impl Into<String>) -> Option<Self> {
        Self::new(owner_id, vec![TurnMessage::user(prompt)])
    }

    /// Returns the owner of the conversation.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Returns the message that drives generation.
    #[must_use]
    pub const fn last(&self) -> &TurnMessage {
        &self.prompt
    }

    /// Returns the messages before the prompt, oldest first.
    #[must_use]
    pub fn earlier(&self) -> &[TurnMessage] {
        &self.earlier
    }

    /// Returns the number of messages, prompt included.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.earlier.len() + 1
    }
}

/// A message as handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier (assigned by storage layer).
    pub id: Option<i64>,
    /// Owner of the conversation.
    pub owner_id: String,
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Unix timestamp when the message was created.
    pub created_at: i64,
}

impl ChatMessage {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: None,
            owner_id: owner_id.into(),
            role,
            content: content.into(),
            created_at: current_timestamp(),
        }
    }

    /// Returns the content size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Returns current Unix timestamp.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_names() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert!("system".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_lowercase() {
        let msg: TurnMessage = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(msg, TurnMessage::user("hi"));
        assert!(serde_json::from_str::<TurnMessage>(r#"{"role":"User","content":"hi"}"#).is_err());
    }

    #[test]
    fn test_chat_turn_requires_owner_and_messages() {
        assert!(ChatTurn::new("", vec![TurnMessage::user("hi")]).is_none());
        assert!(ChatTurn::new("   ", vec![TurnMessage::user("hi")]).is_none());
        assert!(ChatTurn::new("owner", vec![]).is_none());
    }

    #[test]
    fn test_chat_turn_last_is_prompt() {
        let turn = ChatTurn::new(
            "owner",
            vec![
                TurnMessage::user("first"),
                TurnMessage::assistant("answer"),
                TurnMessage::user("second"),
            ],
        )
        .unwrap();
        assert_eq!(turn.last().content, "second");
        assert_eq!(turn.owner_id(), "owner");
        assert_eq!(turn.turn_count(), 3);
        assert_eq!(
            turn.earlier(),
            &[TurnMessage::user("first"), TurnMessage::assistant("answer")]
        );
    }

    #[test]
    fn test_chat_turn_clone_keeps_prompt() {
        let turn = ChatTurn::prompt("owner", "only").unwrap();
        let copy = turn.clone();
        assert_eq!(copy.turn_count(), 1);
        assert!(copy.earlier().is_empty());
        assert_eq!(copy.last(), &TurnMessage::user("only"));
    }

    #[test]
    fn test_chat_message_timestamp() {
        let msg = ChatMessage::new("owner", Role::User, "hello");
        assert!(msg.created_at > 0);
        assert!(msg.id.is_none());
        assert_eq!(msg.size(), 5);
    }
}
