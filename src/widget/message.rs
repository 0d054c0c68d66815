//! Chat messages shown in the widget.

use serde::{Deserialize, Serialize};

/// Author of a widget message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the visitor.
    User,
    /// Reply from the remote service, or a locally produced error notice.
    Assistant,
}

impl Role {
    /// Lowercase name used in markup and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single entry in the conversation.
///
/// Messages are never edited after they are appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Author of the message.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Raw message text (markdown for assistant replies).
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}
