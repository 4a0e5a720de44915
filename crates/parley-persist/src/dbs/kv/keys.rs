//! Key layout of the key-value backend

/// Sorted set of every conversation id, scored by `updated_at`
pub const CONVERSATIONS: &str = "conversations";

/// Counter handing out association ids
pub const MESSAGE_ATTACHMENT_SEQ: &str = "message_attachment:seq";

pub fn conversation(conv_id: &str) -> String {
    format!("conversation:{conv_id}")
}

pub fn message(msg_id: &str) -> String {
    format!("message:{msg_id}")
}

pub fn attachment(attach_id: &str) -> String {
    format!("attachment:{attach_id}")
}

pub fn message_attachment(id: u64) -> String {
    format!("message_attachment:{id}")
}

/// Sorted set of message ids in one conversation, scored by `order_seq`
pub fn conversation_messages(conv_id: &str) -> String {
    format!("conversation:messages:{conv_id}")
}

/// Set of association ids linked to a message
pub fn message_attachments(msg_id: &str) -> String {
    format!("message:attachments:{msg_id}")
}

/// Set of association ids linked to an attachment
pub fn attachment_messages(attach_id: &str) -> String {
    format!("attachment:messages:{attach_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(conversation("c1"), "conversation:c1");
        assert_eq!(message("m1"), "message:m1");
        assert_eq!(attachment("a1"), "attachment:a1");
        assert_eq!(message_attachment(7), "message_attachment:7");
        assert_eq!(conversation_messages("c1"), "conversation:messages:c1");
        assert_eq!(message_attachments("m1"), "message:attachments:m1");
        assert_eq!(attachment_messages("a1"), "attachment:messages:a1");
    }
}
