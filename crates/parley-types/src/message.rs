use serde::{Deserialize, Serialize};

use super::content::Content;
use super::role::Role;

/// A single chat turn, as exchanged with the conversation-driving caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    /// System prompt (instructions)
    System {
        content: Content,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// User/Human message
    #[serde(rename = "user")]
    Human {
        content: Content,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Assistant/AI message
    #[serde(rename = "assistant")]
    AI {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Content>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Tool result message
    Tool {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        content: Content,
    },
}

impl Message {
    /// Create system message
    pub fn system(content: impl Into<Content>) -> Self {
        Self::System {
            content: content.into(),
            name: None,
        }
    }

    /// Create human message
    pub fn human(content: impl Into<Content>) -> Self {
        Self::Human {
            content: content.into(),
            name: None,
        }
    }

    /// Create AI message with text
    pub fn ai(content: impl Into<Content>) -> Self {
        Self::AI {
            content: Some(content.into()),
            name: None,
        }
    }

    /// Create tool result message
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<Content>) -> Self {
        Self::Tool {
            tool_call_id: Some(tool_call_id.into()),
            content: content.into(),
        }
    }

    /// Build a turn from a stored role and plain text
    pub fn from_parts(role: Role, text: impl Into<String>) -> Self {
        let content = Content::text(text);
        match role {
            Role::System => Self::system(content),
            Role::User => Self::human(content),
            Role::Assistant => Self::ai(content),
            Role::Tool => Self::Tool {
                tool_call_id: None,
                content,
            },
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::Human { .. } => Role::User,
            Self::AI { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Flattened text of the turn (empty for an AI turn without content)
    pub fn text(&self) -> String {
        match self {
            Self::System { content, .. }
            | Self::Human { content, .. }
            | Self::Tool { content, .. } => content.to_text(),
            Self::AI { content, .. } => content.as_ref().map(Content::to_text).unwrap_or_default(),
        }
    }
}
