use std::sync::Arc;

use async_trait::async_trait;

use crate::dbs::kv::engine::KvEngine;
use crate::dbs::kv::keys;
use crate::dbs::kv::repositories::{encode, load, load_many, page_bounds};
use crate::error::{PersistError, Result};
use crate::logger::StoreLogger;
use crate::models::{now_unix, Conversation};
use crate::traits::ConversationStore;

#[derive(Clone)]
pub struct KvConversationStore {
    engine: Arc<dyn KvEngine>,
    logger: StoreLogger,
}

/// Write a conversation record and re-score it in the global listing
pub(crate) async fn save_conversation(
    engine: &dyn KvEngine,
    logger: &StoreLogger,
    conversation: &Conversation,
) -> Result<()> {
    let data = encode(logger, conversation)?;
    logger.or_log(
        "save conversation",
        engine.set(&keys::conversation(&conversation.conv_id), &data).await,
    )?;
    logger.or_log(
        "index conversation",
        engine
            .zadd(keys::CONVERSATIONS, &conversation.conv_id, conversation.updated_at as f64)
            .await,
    )
}

/// Refresh `updated_at` of a conversation if it exists; returns whether it did
pub(crate) async fn touch_conversation(
    engine: &dyn KvEngine,
    logger: &StoreLogger,
    conv_id: &str,
    now: i64,
) -> Result<bool> {
    let Some(mut conversation) = load::<Conversation>(engine, logger, &keys::conversation(conv_id)).await? else {
        return Ok(false);
    };
    conversation.updated_at = now;
    save_conversation(engine, logger, &conversation).await?;
    Ok(true)
}

impl KvConversationStore {
    pub fn new(engine: Arc<dyn KvEngine>, logger: StoreLogger) -> Self {
        Self { engine, logger }
    }

    /// Read-modify-write of one conversation, refreshing `updated_at`
    async fn modify<F>(&self, op: &str, conv_id: &str, change: F) -> Result<Conversation>
    where
        F: FnOnce(&mut Conversation) + Send,
    {
        let mut conversation = self.get_by_id(conv_id).await?;
        change(&mut conversation);
        conversation.updated_at = now_unix();
        save_conversation(self.engine.as_ref(), &self.logger, &conversation).await?;
        self.logger.info(format!("{op}: {conv_id}"));
        Ok(conversation)
    }
}

#[async_trait]
impl ConversationStore for KvConversationStore {
    async fn create(&self, mut conversation: Conversation) -> Result<Conversation> {
        conversation.prepare_for_insert(now_unix());
        let data = encode(&self.logger, &conversation)?;

        let key = keys::conversation(&conversation.conv_id);
        if !self.logger.or_log("create conversation", self.engine.set_nx(&key, &data).await)? {
            self.logger.error(format!("conversation already exists: {}", conversation.conv_id));
            return Err(PersistError::Conflict(format!(
                "conversation {} already exists",
                conversation.conv_id
            )));
        }
        self.logger.or_log(
            "index conversation",
            self.engine
                .zadd(keys::CONVERSATIONS, &conversation.conv_id, conversation.updated_at as f64)
                .await,
        )?;

        self.logger.info(format!("conversation created: {}", conversation.conv_id));
        Ok(conversation)
    }

    async fn update(&self, conversation: Conversation) -> Result<Conversation> {
        let conv_id = conversation.conv_id.clone();
        self.modify("update conversation", &conv_id, move |stored| {
            stored.title = conversation.title;
            stored.settings = conversation.settings;
            stored.is_archived = conversation.is_archived;
            stored.is_pinned = conversation.is_pinned;
        })
        .await
    }

    async fn delete(&self, conv_id: &str) -> Result<()> {
        let key = keys::conversation(conv_id);
        if !self.logger.or_log("check conversation", self.engine.exists(&key).await)? {
            return Err(self.logger.not_found("conversation", conv_id));
        }

        // stops at the first failure; earlier steps are not rolled back
        let messages_key = keys::conversation_messages(conv_id);
        let msg_ids = self
            .logger
            .or_log("read conversation messages", self.engine.zrange(&messages_key, 0, -1).await)?;
        for msg_id in &msg_ids {
            self.logger
                .or_log("delete message", self.engine.del(&keys::message(msg_id)).await)?;
        }
        self.logger
            .or_log("delete message index", self.engine.del(&messages_key).await)?;
        self.logger.or_log("delete conversation", self.engine.del(&key).await)?;
        self.logger.or_log(
            "unindex conversation",
            self.engine.zrem(keys::CONVERSATIONS, conv_id).await,
        )?;

        self.logger.info(format!(
            "conversation deleted: {conv_id} ({} messages)",
            msg_ids.len()
        ));
        Ok(())
    }

    async fn get_by_id(&self, conv_id: &str) -> Result<Conversation> {
        load(self.engine.as_ref(), &self.logger, &keys::conversation(conv_id))
            .await?
            .ok_or_else(|| self.logger.not_found("conversation", conv_id))
    }

    async fn first_or_create(&self, conv_id: &str) -> Result<Conversation> {
        if conv_id.is_empty() {
            return Err(PersistError::InvalidArgument("conversation id must not be empty".into()));
        }

        let mut fresh = Conversation::new(conv_id);
        fresh.prepare_for_insert(now_unix());
        let data = encode(&self.logger, &fresh)?;

        // SET NX is the single atomic decision point for concurrent callers
        let created = self.logger.or_log(
            "first_or_create conversation",
            self.engine.set_nx(&keys::conversation(conv_id), &data).await,
        )?;
        if created {
            self.logger.or_log(
                "index conversation",
                self.engine
                    .zadd(keys::CONVERSATIONS, conv_id, fresh.updated_at as f64)
                    .await,
            )?;
            self.logger.info(format!("conversation created on first use: {conv_id}"));
            return Ok(fresh);
        }

        self.get_by_id(conv_id).await
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Conversation>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let (start, stop) = page_bounds(offset, limit);
        let ids = self.logger.or_log(
            "list conversation ids",
            self.engine.zrevrange(keys::CONVERSATIONS, start, stop).await,
        )?;
        let record_keys: Vec<String> = ids.iter().map(|id| keys::conversation(id)).collect();
        let conversations: Vec<Conversation> =
            load_many(self.engine.as_ref(), &self.logger, &record_keys).await?;

        self.logger.debug(format!(
            "listed {} conversations (offset {offset}, limit {limit})",
            conversations.len()
        ));
        Ok(conversations)
    }

    async fn archive(&self, conv_id: &str) -> Result<()> {
        self.modify("archive conversation", conv_id, |c| c.is_archived = true)
            .await
            .map(|_| ())
    }

    async fn unarchive(&self, conv_id: &str) -> Result<()> {
        self.modify("unarchive conversation", conv_id, |c| c.is_archived = false)
            .await
            .map(|_| ())
    }

    async fn pin(&self, conv_id: &str) -> Result<()> {
        self.modify("pin conversation", conv_id, |c| c.is_pinned = true)
            .await
            .map(|_| ())
    }

    async fn unpin(&self, conv_id: &str) -> Result<()> {
        self.modify("unpin conversation", conv_id, |c| c.is_pinned = false)
            .await
            .map(|_| ())
    }
}
