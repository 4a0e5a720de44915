use serde::{Deserialize, Serialize};

/// Link between one message and one attachment
///
/// `id` is a surrogate handle used for deletion; `0` means "assign one".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MessageAttachment {
    pub id: u64,
    pub message_id: String,
    pub attachment_id: String,
}

impl MessageAttachment {
    pub fn new(message_id: impl Into<String>, attachment_id: impl Into<String>) -> Self {
        Self {
            id: 0,
            message_id: message_id.into(),
            attachment_id: attachment_id.into(),
        }
    }
}
