use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::coach::CoachPersona;
use crate::model::ids::ChatMessageId;

pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message is too long ({0} characters, max 2000)")]
    TooLong(usize),
    #[error("unknown chat role: {0:?}")]
    UnknownRole(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Coach,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Coach => "coach",
        }
    }
}

impl std::str::FromStr for ChatRole {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ChatRole::User),
            "coach" => Ok(ChatRole::Coach),
            other => Err(ChatError::UnknownRole(other.to_string())),
        }
    }
}

/// Raw text typed into (or produced for) the chat room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub role: ChatRole,
    pub persona: CoachPersona,
    pub body: String,
}

impl MessageDraft {
    #[must_use]
    pub fn user(persona: CoachPersona, body: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            persona,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn coach(persona: CoachPersona, body: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Coach,
            persona,
            body: body.into(),
        }
    }

    /// # Errors
    ///
    /// Returns `ChatError` if the trimmed body is empty or longer than
    /// `MAX_MESSAGE_CHARS` characters.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewChatMessage, ChatError> {
        let body = self.body.trim().to_string();
        if body.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let chars = body.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(ChatError::TooLong(chars));
        }
        Ok(NewChatMessage {
            role: self.role,
            persona: self.persona,
            body,
            sent_at: now,
        })
    }
}

/// Validated message waiting for a store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub role: ChatRole,
    pub persona: CoachPersona,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl NewChatMessage {
    #[must_use]
    pub fn assign_id(self, id: ChatMessageId) -> ChatMessage {
        ChatMessage {
            id,
            role: self.role,
            persona: self.persona,
            body: self.body,
            sent_at: self.sent_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub role: ChatRole,
    pub persona: CoachPersona,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn blank_message_is_rejected() {
        let err = MessageDraft::user(CoachPersona::Strict, "  \n ")
            .validate(fixed_now())
            .unwrap_err();
        assert_eq!(err, ChatError::EmptyMessage);
    }

    #[test]
    fn long_message_is_rejected() {
        let body = "a".repeat(MAX_MESSAGE_CHARS + 1);
        let err = MessageDraft::user(CoachPersona::Strict, body)
            .validate(fixed_now())
            .unwrap_err();
        assert_eq!(err, ChatError::TooLong(MAX_MESSAGE_CHARS + 1));
    }

    #[test]
    fn validated_message_keeps_role_and_persona() {
        let msg = MessageDraft::coach(CoachPersona::Playful, " hello ")
            .validate(fixed_now())
            .unwrap()
            .assign_id(ChatMessageId::new(3));
        assert_eq!(msg.body, "hello");
        assert_eq!(msg.role, ChatRole::Coach);
        assert_eq!(msg.persona, CoachPersona::Playful);
    }
}
