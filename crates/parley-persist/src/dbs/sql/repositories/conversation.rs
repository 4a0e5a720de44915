use async_trait::async_trait;
use sqlx::AnyPool;

use crate::dbs::sql::dialect::Dialect;
use crate::dbs::sql::models::{conversation_from_row, encode_settings, flag, CONVERSATION_COLUMNS};
use crate::dbs::sql::repositories::AnyQuery;
use crate::error::{PersistError, Result};
use crate::logger::StoreLogger;
use crate::models::{now_unix, Conversation};
use crate::traits::ConversationStore;

#[derive(Clone)]
pub struct SqlConversationStore {
    pool: AnyPool,
    dialect: Dialect,
    logger: StoreLogger,
}

impl SqlConversationStore {
    pub fn new(pool: AnyPool, dialect: Dialect, logger: StoreLogger) -> Self {
        Self {
            pool,
            dialect,
            logger,
        }
    }

    async fn find(&self, conv_id: &str) -> Result<Option<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE conv_id = ?");
        let row = sqlx::query(&sql).bind(conv_id).fetch_optional(&self.pool).await;
        self.logger
            .or_log("get conversation", row)?
            .map(|row| conversation_from_row(&row))
            .transpose()
    }

    /// Run a single-row update; zero affected rows is NotFound only if the row is really gone
    async fn apply(&self, op: &str, conv_id: &str, query: AnyQuery<'_>) -> Result<()> {
        let result = self.logger.or_log(op, query.execute(&self.pool).await)?;
        if result.rows_affected() == 0 && self.find(conv_id).await?.is_none() {
            return Err(self.logger.not_found("conversation", conv_id));
        }
        self.logger.info(format!("{op}: {conv_id}"));
        Ok(())
    }

    async fn set_flag(&self, op: &str, column: &'static str, conv_id: &str, value: bool) -> Result<()> {
        let sql = format!("UPDATE conversations SET {column} = ?, updated_at = ? WHERE conv_id = ?");
        let query = sqlx::query(&sql).bind(flag(value)).bind(now_unix()).bind(conv_id);
        self.apply(op, conv_id, query).await
    }
}

#[async_trait]
impl ConversationStore for SqlConversationStore {
    async fn create(&self, mut conversation: Conversation) -> Result<Conversation> {
        conversation.prepare_for_insert(now_unix());
        let settings = encode_settings(&conversation.settings)?;

        let sql = format!("INSERT INTO conversations ({CONVERSATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)");
        let result = sqlx::query(&sql)
            .bind(conversation.conv_id.as_str())
            .bind(conversation.title.as_str())
            .bind(settings)
            .bind(conversation.created_at)
            .bind(conversation.updated_at)
            .bind(flag(conversation.is_archived))
            .bind(flag(conversation.is_pinned))
            .execute(&self.pool)
            .await;
        self.logger.or_log("create conversation", result)?;

        self.logger.info(format!("conversation created: {}", conversation.conv_id));
        Ok(conversation)
    }

    async fn update(&self, conversation: Conversation) -> Result<Conversation> {
        let settings = encode_settings(&conversation.settings)?;
        let sql = "UPDATE conversations SET title = ?, settings = ?, is_archived = ?, is_pinned = ?, \
                   updated_at = ? WHERE conv_id = ?";
        let query = sqlx::query(sql)
            .bind(conversation.title.as_str())
            .bind(settings)
            .bind(flag(conversation.is_archived))
            .bind(flag(conversation.is_pinned))
            .bind(now_unix())
            .bind(conversation.conv_id.as_str());
        self.apply("update conversation", &conversation.conv_id, query).await?;
        self.get_by_id(&conversation.conv_id).await
    }

    async fn delete(&self, conv_id: &str) -> Result<()> {
        let mut tx = self.logger.or_log("begin delete conversation", self.pool.begin().await)?;

        let links = sqlx::query(
            "DELETE FROM message_attachments WHERE message_id IN \
             (SELECT msg_id FROM messages WHERE conversation_id = ?)",
        )
        .bind(conv_id)
        .execute(&mut *tx)
        .await;
        self.logger.or_log("delete conversation attachments", links)?;

        let messages = sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(conv_id)
            .execute(&mut *tx)
            .await;
        let messages = self.logger.or_log("delete conversation messages", messages)?;

        let removed = sqlx::query("DELETE FROM conversations WHERE conv_id = ?")
            .bind(conv_id)
            .execute(&mut *tx)
            .await;
        if self.logger.or_log("delete conversation", removed)?.rows_affected() == 0 {
            // dropping the transaction rolls it back
            return Err(self.logger.not_found("conversation", conv_id));
        }

        self.logger.or_log("commit delete conversation", tx.commit().await)?;
        self.logger.info(format!(
            "conversation deleted: {conv_id} ({} messages)",
            messages.rows_affected()
        ));
        Ok(())
    }

    async fn get_by_id(&self, conv_id: &str) -> Result<Conversation> {
        self.find(conv_id)
            .await?
            .ok_or_else(|| self.logger.not_found("conversation", conv_id))
    }

    async fn first_or_create(&self, conv_id: &str) -> Result<Conversation> {
        if conv_id.is_empty() {
            return Err(PersistError::InvalidArgument("conversation id must not be empty".into()));
        }

        let now = now_unix();
        let sql = format!(
            "{} conversations ({CONVERSATION_COLUMNS}) VALUES (?, '', '', ?, ?, 0, 0)",
            self.dialect.insert_ignore()
        );
        let result = sqlx::query(&sql).bind(conv_id).bind(now).bind(now).execute(&self.pool).await;
        if self.logger.or_log("first_or_create conversation", result)?.rows_affected() > 0 {
            self.logger.info(format!("conversation created on first use: {conv_id}"));
        }

        self.get_by_id(conv_id).await
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Conversation>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await;
        let conversations = self
            .logger
            .or_log("list conversations", rows)?
            .iter()
            .map(conversation_from_row)
            .collect::<Result<Vec<_>>>()?;

        self.logger.debug(format!(
            "listed {} conversations (offset {offset}, limit {limit})",
            conversations.len()
        ));
        Ok(conversations)
    }

    async fn archive(&self, conv_id: &str) -> Result<()> {
        self.set_flag("archive conversation", "is_archived", conv_id, true).await
    }

    async fn unarchive(&self, conv_id: &str) -> Result<()> {
        self.set_flag("unarchive conversation", "is_archived", conv_id, false).await
    }

    async fn pin(&self, conv_id: &str) -> Result<()> {
        self.set_flag("pin conversation", "is_pinned", conv_id, true).await
    }

    async fn unpin(&self, conv_id: &str) -> Result<()> {
        self.set_flag("unpin conversation", "is_pinned", conv_id, false).await
    }
}
