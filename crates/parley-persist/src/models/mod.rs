mod attachment;
mod conversation;
mod db_message;
mod message_attachment;

// Export database-agnostic models
pub use attachment::Attachment;
pub use conversation::Conversation;
pub use db_message::DBMessage;
pub use message_attachment::MessageAttachment;

/// Current unix time in seconds
pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
