use std::sync::Arc;

use parley_persist::{
    create_provider, Conversation, ConversationStore, DBMessage, MessageStore, Provider, ProviderConfig, Result,
};
use parley_types::Message;

/// Page size used by [`History::get_history`] when the caller passes `0`
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Entry point for callers: one conversation store plus one message store
///
/// Errors from the stores are returned unchanged.
pub struct History {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    provider: Option<Arc<dyn Provider>>,
}

impl History {
    /// Wrap stores owned elsewhere; [`History::close`] is then a no-op
    pub fn new(conversations: Arc<dyn ConversationStore>, messages: Arc<dyn MessageStore>) -> Self {
        Self {
            conversations,
            messages,
            provider: None,
        }
    }

    /// Use the stores of `provider` and take part in its shutdown
    pub fn from_provider(provider: Arc<dyn Provider>) -> Self {
        Self {
            conversations: provider.conversations(),
            messages: provider.messages(),
            provider: Some(provider),
        }
    }

    /// Build a provider from `config` and wrap it
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        Ok(Self::from_provider(create_provider(config).await?))
    }

    pub fn conversations(&self) -> &Arc<dyn ConversationStore> {
        &self.conversations
    }

    pub fn messages(&self) -> &Arc<dyn MessageStore> {
        &self.messages
    }

    pub fn provider(&self) -> Option<&Arc<dyn Provider>> {
        self.provider.as_ref()
    }

    pub async fn close(&self) -> Result<()> {
        match &self.provider {
            Some(provider) => provider.close().await,
            None => Ok(()),
        }
    }

    /// Persist a chat turn at the end of `conversation_id`
    pub async fn save_message(&self, turn: &Message, conversation_id: &str) -> Result<()> {
        let message = self.messages.create(DBMessage::from_chat(turn, conversation_id)).await?;
        tracing::debug!(
            conversation_id,
            msg_id = %message.msg_id,
            order_seq = message.order_seq,
            "saved chat turn"
        );
        Ok(())
    }

    /// The first `limit` turns of a conversation in order (`0` means 100)
    ///
    /// An unknown conversation is created empty, so a fresh id yields an
    /// empty history instead of an error.
    pub async fn get_history(&self, conversation_id: &str, limit: usize) -> Result<Vec<Message>> {
        let limit = if limit == 0 { DEFAULT_HISTORY_LIMIT } else { limit };

        self.conversations.first_or_create(conversation_id).await?;
        let stored = self
            .messages
            .list_by_conversation(conversation_id, 0, limit)
            .await?;

        Ok(stored.into_iter().map(Message::from).collect())
    }

    pub async fn create_conversation(
        &self,
        title: impl Into<String>,
        settings: Option<serde_json::Value>,
    ) -> Result<Conversation> {
        let mut conversation = Conversation::new("").with_title(title);
        conversation.settings = settings;
        self.conversations.create(conversation).await
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        self.conversations.get_by_id(conversation_id).await
    }

    pub async fn update_conversation(&self, conversation: Conversation) -> Result<Conversation> {
        self.conversations.update(conversation).await
    }

    /// Remove a conversation and every message in it
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.conversations.delete(conversation_id).await
    }

    pub async fn archive_conversation(&self, conversation_id: &str) -> Result<()> {
        self.conversations.archive(conversation_id).await
    }

    pub async fn unarchive_conversation(&self, conversation_id: &str) -> Result<()> {
        self.conversations.unarchive(conversation_id).await
    }

    pub async fn pin_conversation(&self, conversation_id: &str) -> Result<()> {
        self.conversations.pin(conversation_id).await
    }

    pub async fn unpin_conversation(&self, conversation_id: &str) -> Result<()> {
        self.conversations.unpin(conversation_id).await
    }

    /// Conversations by most recent activity
    pub async fn list_conversations(&self, offset: usize, limit: usize) -> Result<Vec<Conversation>> {
        self.conversations.list(offset, limit).await
    }
}
