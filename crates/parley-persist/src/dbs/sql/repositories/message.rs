use async_trait::async_trait;
use sqlx::AnyPool;

use crate::dbs::sql::models::{flag, message_from_row, MESSAGE_COLUMNS};
use crate::dbs::sql::repositories::AnyQuery;
use crate::error::{PersistError, Result};
use crate::logger::{preview, StoreLogger};
use crate::models::{now_unix, DBMessage};
use crate::traits::MessageStore;

#[derive(Clone)]
pub struct SqlMessageStore {
    pool: AnyPool,
    logger: StoreLogger,
}

impl SqlMessageStore {
    pub fn new(pool: AnyPool, logger: StoreLogger) -> Self {
        Self { pool, logger }
    }

    async fn find(&self, msg_id: &str) -> Result<Option<DBMessage>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE msg_id = ?");
        let row = sqlx::query(&sql).bind(msg_id).fetch_optional(&self.pool).await;
        self.logger
            .or_log("get message", row)?
            .map(|row| message_from_row(&row))
            .transpose()
    }

    async fn apply(&self, op: &str, msg_id: &str, query: AnyQuery<'_>) -> Result<()> {
        let result = self.logger.or_log(op, query.execute(&self.pool).await)?;
        if result.rows_affected() == 0 && self.find(msg_id).await?.is_none() {
            return Err(self.logger.not_found("message", msg_id));
        }
        self.logger.info(format!("{op}: {msg_id}"));
        Ok(())
    }

    async fn set_flag(&self, op: &str, column: &'static str, msg_id: &str, value: bool) -> Result<()> {
        let sql = format!("UPDATE messages SET {column} = ? WHERE msg_id = ?");
        let query = sqlx::query(&sql).bind(flag(value)).bind(msg_id);
        self.apply(op, msg_id, query).await
    }
}

#[async_trait]
impl MessageStore for SqlMessageStore {
    async fn create(&self, mut message: DBMessage) -> Result<DBMessage> {
        if message.conversation_id.is_empty() {
            return Err(PersistError::InvalidArgument("message has no conversation id".into()));
        }
        let now = now_unix();
        message.prepare_for_insert(now);

        let mut tx = self.logger.or_log("begin create message", self.pool.begin().await)?;

        if message.order_seq == 0 {
            let max = sqlx::query_scalar::<_, Option<i64>>(
                "SELECT MAX(order_seq) FROM messages WHERE conversation_id = ?",
            )
            .bind(message.conversation_id.as_str())
            .fetch_one(&mut *tx)
            .await;
            message.order_seq = self.logger.or_log("next order_seq", max)?.unwrap_or(0) + 1;
        }

        let sql = format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)");
        let inserted = sqlx::query(&sql)
            .bind(message.msg_id.as_str())
            .bind(message.conversation_id.as_str())
            .bind(message.role.as_str())
            .bind(message.content.as_str())
            .bind(message.order_seq)
            .bind(message.status.as_str())
            .bind(message.token_count)
            .bind(flag(message.is_context_edge))
            .bind(flag(message.is_variant))
            .bind(message.created_at)
            .execute(&mut *tx)
            .await;
        self.logger.or_log("create message", inserted)?;

        let touched = sqlx::query("UPDATE conversations SET updated_at = ? WHERE conv_id = ?")
            .bind(now)
            .bind(message.conversation_id.as_str())
            .execute(&mut *tx)
            .await;
        self.logger.or_log("touch conversation", touched)?;

        self.logger.or_log("commit create message", tx.commit().await)?;
        self.logger.info(format!(
            "message created: {} (conversation {}, seq {})",
            message.msg_id, message.conversation_id, message.order_seq
        ));
        Ok(message)
    }

    async fn update(&self, message: &DBMessage) -> Result<()> {
        let current = self
            .find(&message.msg_id)
            .await?
            .ok_or_else(|| self.logger.not_found("message", &message.msg_id))?;
        if current.conversation_id != message.conversation_id {
            return Err(PersistError::InvalidArgument(format!(
                "message {} cannot move from conversation {} to {}",
                message.msg_id, current.conversation_id, message.conversation_id
            )));
        }

        let sql = "UPDATE messages SET role = ?, content = ?, order_seq = ?, status = ?, token_count = ?, \
                   is_context_edge = ?, is_variant = ?, created_at = ? WHERE msg_id = ?";
        let query = sqlx::query(sql)
            .bind(message.role.as_str())
            .bind(message.content.as_str())
            .bind(message.order_seq)
            .bind(message.status.as_str())
            .bind(message.token_count)
            .bind(flag(message.is_context_edge))
            .bind(flag(message.is_variant))
            .bind(message.created_at)
            .bind(message.msg_id.as_str());
        self.apply("update message", &message.msg_id, query).await
    }

    async fn delete(&self, msg_id: &str) -> Result<()> {
        let mut tx = self.logger.or_log("begin delete message", self.pool.begin().await)?;

        let links = sqlx::query("DELETE FROM message_attachments WHERE message_id = ?")
            .bind(msg_id)
            .execute(&mut *tx)
            .await;
        self.logger.or_log("delete message attachments", links)?;

        let removed = sqlx::query("DELETE FROM messages WHERE msg_id = ?")
            .bind(msg_id)
            .execute(&mut *tx)
            .await;
        if self.logger.or_log("delete message", removed)?.rows_affected() == 0 {
            return Err(self.logger.not_found("message", msg_id));
        }

        self.logger.or_log("commit delete message", tx.commit().await)?;
        self.logger.info(format!("message deleted: {msg_id}"));
        Ok(())
    }

    async fn get_by_id(&self, msg_id: &str) -> Result<DBMessage> {
        self.find(msg_id)
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

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? \
             ORDER BY order_seq ASC, id ASC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(conversation_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await;
        let messages = self
            .logger
            .or_log("list messages", rows)?
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>>>()?;

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
        let query = sqlx::query("UPDATE messages SET status = ? WHERE msg_id = ?")
            .bind(status)
            .bind(msg_id);
        self.apply("update message status", msg_id, query).await
    }

    async fn update_token_count(&self, msg_id: &str, token_count: i64) -> Result<()> {
        let query = sqlx::query("UPDATE messages SET token_count = ? WHERE msg_id = ?")
            .bind(token_count)
            .bind(msg_id);
        self.apply("update message token count", msg_id, query).await
    }

    async fn set_context_edge(&self, msg_id: &str, is_context_edge: bool) -> Result<()> {
        self.set_flag("set message context edge", "is_context_edge", msg_id, is_context_edge)
            .await
    }

    async fn set_variant(&self, msg_id: &str, is_variant: bool) -> Result<()> {
        self.set_flag("set message variant", "is_variant", msg_id, is_variant)
            .await
    }
}
