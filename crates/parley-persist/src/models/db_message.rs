use serde::{Deserialize, Serialize};
use parley_types::Role;

/// Database-agnostic message model
///
/// `order_seq` totally orders the messages of one conversation; `0` asks the
/// store to assign the next value. `conversation_id` cannot change after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DBMessage {
    pub msg_id: String,
    pub conversation_id: String,
    pub role: Role,
    pub content: String,
    pub order_seq: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub token_count: i64,
    #[serde(default)]
    pub is_context_edge: bool,
    #[serde(default)]
    pub is_variant: bool,
    pub created_at: i64,
}

impl Default for DBMessage {
    fn default() -> Self {
        Self {
            msg_id: String::new(),
            conversation_id: String::new(),
            role: Role::User,
            content: String::new(),
            order_seq: 0,
            status: String::new(),
            token_count: 0,
            is_context_edge: false,
            is_variant: false,
            created_at: 0,
        }
    }
}

impl DBMessage {
    pub fn new(conversation_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            role,
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_order_seq(mut self, order_seq: i64) -> Self {
        self.order_seq = order_seq;
        self
    }

    /// Translate an external chat turn into a message of `conversation_id`
    pub fn from_chat(turn: &parley_types::Message, conversation_id: impl Into<String>) -> Self {
        Self::new(conversation_id, turn.role(), turn.text())
    }

    /// Fill in the id and creation time a caller left unset
    pub(crate) fn prepare_for_insert(&mut self, now: i64) {
        if self.msg_id.is_empty() {
            self.msg_id = uuid::Uuid::new_v4().to_string();
        }
        if self.created_at == 0 {
            self.created_at = now;
        }
    }
}

// Conversion: DBMessage → parley_types::Message
impl From<DBMessage> for parley_types::Message {
    fn from(msg: DBMessage) -> Self {
        parley_types::Message::from_parts(msg.role, msg.content)
    }
}

impl From<&DBMessage> for parley_types::Message {
    fn from(msg: &DBMessage) -> Self {
        parley_types::Message::from_parts(msg.role, msg.content.clone())
    }
}
