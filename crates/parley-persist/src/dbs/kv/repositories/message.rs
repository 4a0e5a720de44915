use std::sync::Arc;

use async_trait::async_trait;

use crate::dbs::kv::engine::KvEngine;
use crate::dbs::kv::keys;
use crate::dbs::kv::repositories::conversation::touch_conversation;
use crate::dbs::kv::repositories::{encode, load, load_many, page_bounds};
use crate::error::{PersistError, Result};
use crate::logger::{preview, StoreLogger};
use crate::models::{now_unix, DBMessage};
use crate::traits::MessageStore;

#[derive(Clone)]
pub struct KvMessageStore {
    engine: Arc<dyn KvEngine>,
    logger: StoreLogger,
}

impl KvMessageStore {
    pub fn new(engine: Arc<dyn KvEngine>, logger: StoreLogger) -> Self {
        Self { engine, logger }
    }

    /// Highest `order_seq` in a conversation plus one
    ///
    /// Two appends racing on one conversation can read the same maximum.
    async fn next_order_seq(&self, conversation_id: &str) -> Result<i64> {
        let top = self.logger.or_log(
            "read last order_seq",
            self.engine
                .zrevrange_withscores(&keys::conversation_messages(conversation_id), 0, 0)
                .await,
        )?;
        Ok(top.first().map(|(_, score)| *score as i64).unwrap_or(0) + 1)
    }

    /// Fail when a different message of the conversation already holds `order_seq`
    async fn ensure_order_seq_free(&self, message: &DBMessage) -> Result<()> {
        let seq = message.order_seq as f64;
        let holders = self.logger.or_log(
            "check order_seq",
            self.engine
                .zrangebyscore(&keys::conversation_messages(&message.conversation_id), seq, seq)
                .await,
        )?;
        if let Some(holder) = holders.iter().find(|id| **id != message.msg_id) {
            self.logger.error(format!(
                "order_seq {} of conversation {} is held by message {holder}",
                message.order_seq, message.conversation_id
            ));
            return Err(PersistError::Conflict(format!(
                "order_seq {} already used in conversation {}",
                message.order_seq, message.conversation_id
            )));
        }
        Ok(())
    }

    /// Write the record and upsert its position in the conversation
    async fn save(&self, message: &DBMessage) -> Result<()> {
        let data = encode(&self.logger, message)?;
        self.logger.or_log(
            "save message",
            self.engine.set(&keys::message(&message.msg_id), &data).await,
        )?;
        self.index(message).await
    }

    async fn index(&self, message: &DBMessage) -> Result<()> {
        self.logger.or_log(
            "index message",
            self.engine
                .zadd(
                    &keys::conversation_messages(&message.conversation_id),
                    &message.msg_id,
                    message.order_seq as f64,
                )
                .await,
        )
    }

    async fn modify<F>(&self, op: &str, msg_id: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut DBMessage) + Send,
    {
        let mut message = self.get_by_id(msg_id).await?;
        change(&mut message);
        let data = encode(&self.logger, &message)?;
        self.logger
            .or_log(op, self.engine.set(&keys::message(msg_id), &data).await)?;
        self.logger.info(format!("{op}: {msg_id}"));
        Ok(())
    }
}

#[async_trait]
impl MessageStore for KvMessageStore {
    async fn create(&self, mut message: DBMessage) -> Result<DBMessage> {
        if message.conversation_id.is_empty() {
            return Err(PersistError::InvalidArgument("message has no conversation id".into()));
        }
        let now = now_unix();
        message.prepare_for_insert(now);
        if message.order_seq == 0 {
            message.order_seq = self.next_order_seq(&message.conversation_id).await?;
        }
        self.ensure_order_seq_free(&message).await?;

        let data = encode(&self.logger, &message)?;
        let written = self.logger.or_log(
            "create message",
            self.engine.set_nx(&keys::message(&message.msg_id), &data).await,
        )?;
        if !written {
            self.logger.error(format!("message already exists: {}", message.msg_id));
            return Err(PersistError::Conflict(format!("message {} already exists", message.msg_id)));
        }
        self.index(&message).await?;
        touch_conversation(self.engine.as_ref(), &self.logger, &message.conversation_id, now).await?;

        self.logger.info(format!(
            "message created: {} (conversation {}, seq {})",
            message.msg_id, message.conversation_id, message.order_seq
        ));
        Ok(message)
    }

    async fn update(&self, message: &DBMessage) -> Result<()> {
        let current = self.get_by_id(&message.msg_id).await?;
        if current.conversation_id != message.conversation_id {
            return Err(PersistError::InvalidArgument(format!(
                "message {} cannot move from conversation {} to {}",
                message.msg_id, current.conversation_id, message.conversation_id
            )));
        }
        if current.order_seq != message.order_seq {
            self.ensure_order_seq_free(message).await?;
        }

        self.save(message).await?;
        self.logger.info(format!("message updated: {}", message.msg_id));
        Ok(())
    }

    async fn delete(&self, msg_id: &str) -> Result<()> {
        // associations are left in place; attachment listings skip them
        let message = self.get_by_id(msg_id).await?;
        self.logger
            .or_log("delete message", self.engine.del(&keys::message(msg_id)).await)?;
        self.logger.or_log(
            "unindex message",
            self.engine
                .zrem(&keys::conversation_messages(&message.conversation_id), msg_id)
                .await,
        )?;

        self.logger.info(format!("message deleted: {msg_id}"));
        Ok(())
    }

    async fn get_by_id(&self, msg_id: &str) -> Result<DBMessage> {
        load(self.engine.as_ref(), &self.logger, &keys::message(msg_id))
            .await?
            .ok_or_else(|| self.logger.not_found("message", msg_id))
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DBMessage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let (start, stop) = page_bounds(offset, limit);
        let ids = self.logger.or_log(
            "list message ids",
            self.engine
                .zrange(&keys::conversation_messages(conversation_id), start, stop)
                .await,
        )?;
        let record_keys: Vec<String> = ids.iter().map(|id| keys::message(id)).collect();
        let messages: Vec<DBMessage> = load_many(self.engine.as_ref(), &self.logger, &record_keys).await?;

        self.logger.debug(format!(
            "listed {} messages of conversation {conversation_id}",
            messages.len()
        ));
        for message in &messages {
            self.logger.debug(format!(
                "  [{}] {}: {}",
                message.order_seq,
                message.role,
                preview(&message.content)
            ));
        }
        Ok(messages)
    }

    async fn update_status(&self, msg_id: &str, status: &str) -> Result<()> {
        let status = status.to_string();
        self.modify("update message status", msg_id, move |m| m.status = status)
            .await
    }

    async fn update_token_count(&self, msg_id: &str, token_count: i64) -> Result<()> {
        self.modify("update message token count", msg_id, move |m| m.token_count = token_count)
            .await
    }

    async fn set_context_edge(&self, msg_id: &str, is_context_edge: bool) -> Result<()> {
        self.modify("set message context edge", msg_id, move |m| m.is_context_edge = is_context_edge)
            .await
    }

    async fn set_variant(&self, msg_id: &str, is_variant: bool) -> Result<()> {
        self.modify("set message variant", msg_id, move |m| m.is_variant = is_variant)
            .await
    }
}
