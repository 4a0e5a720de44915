use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Attachment, Conversation, DBMessage, MessageAttachment};

/// Message persistence
///
/// Implementations must behave identically regardless of backend: listings are
/// ordered by `order_seq` ascending, an `order_seq` is held by at most one
/// message per conversation (`PersistError::Conflict` otherwise), and lookups
/// of unknown ids fail with `PersistError::NotFound`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message, assigning `msg_id`, `created_at` and `order_seq`
    /// when unset. Refreshes the owning conversation's `updated_at`.
    async fn create(&self, message: DBMessage) -> Result<DBMessage>;

    /// Overwrite an existing message (its `conversation_id` must not change)
    async fn update(&self, message: &DBMessage) -> Result<()>;

    async fn delete(&self, msg_id: &str) -> Result<()>;

    async fn get_by_id(&self, msg_id: &str) -> Result<DBMessage>;

    /// Page through a conversation in `order_seq` order
    async fn list_by_conversation(
        &self,
        conversation_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DBMessage>>;

    async fn update_status(&self, msg_id: &str, status: &str) -> Result<()>;

    async fn update_token_count(&self, msg_id: &str, token_count: i64) -> Result<()>;

    async fn set_context_edge(&self, msg_id: &str, is_context_edge: bool) -> Result<()>;

    async fn set_variant(&self, msg_id: &str, is_variant: bool) -> Result<()>;
}

/// Conversation persistence
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a new conversation, generating `conv_id` and timestamps when unset
    async fn create(&self, conversation: Conversation) -> Result<Conversation>;

    /// Overwrite an existing conversation; returns it with a refreshed `updated_at`
    async fn update(&self, conversation: Conversation) -> Result<Conversation>;

    /// Delete a conversation together with all of its messages
    async fn delete(&self, conv_id: &str) -> Result<()>;

    async fn get_by_id(&self, conv_id: &str) -> Result<Conversation>;

    /// Return the conversation with `conv_id`, creating an empty one if absent
    async fn first_or_create(&self, conv_id: &str) -> Result<Conversation>;

    /// Page through all conversations, most recently updated first
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Conversation>>;

    async fn archive(&self, conv_id: &str) -> Result<()>;

    async fn unarchive(&self, conv_id: &str) -> Result<()>;

    async fn pin(&self, conv_id: &str) -> Result<()>;

    async fn unpin(&self, conv_id: &str) -> Result<()>;
}

/// Attachment metadata persistence
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn create(&self, attachment: Attachment) -> Result<Attachment>;

    async fn update(&self, attachment: &Attachment) -> Result<()>;

    async fn delete(&self, attach_id: &str) -> Result<()>;

    async fn get_by_id(&self, attach_id: &str) -> Result<Attachment>;

    /// Every attachment linked to `msg_id` (order not guaranteed)
    async fn list_by_message(&self, msg_id: &str) -> Result<Vec<Attachment>>;
}

/// Message ↔ attachment associations
#[async_trait]
pub trait MessageAttachmentStore: Send + Sync {
    /// Persist an association, assigning its surrogate `id` when zero
    async fn create(&self, link: MessageAttachment) -> Result<MessageAttachment>;

    async fn delete(&self, id: u64) -> Result<()>;

    async fn list_by_message(&self, msg_id: &str) -> Result<Vec<MessageAttachment>>;

    async fn list_by_attachment(&self, attach_id: &str) -> Result<Vec<MessageAttachment>>;

    /// Remove every association between the pair; returns how many were removed
    async fn delete_by_message_and_attachment(&self, msg_id: &str, attach_id: &str) -> Result<u64>;

    async fn delete_by_message(&self, msg_id: &str) -> Result<u64>;

    async fn delete_by_attachment(&self, attach_id: &str) -> Result<u64>;
}
