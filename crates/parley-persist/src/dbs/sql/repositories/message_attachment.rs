use async_trait::async_trait;
use sqlx::AnyPool;

use crate::dbs::sql::dialect::Dialect;
use crate::dbs::sql::models::{message_attachment_from_row, MESSAGE_ATTACHMENT_COLUMNS};
use crate::error::{PersistError, Result};
use crate::logger::StoreLogger;
use crate::models::MessageAttachment;
use crate::traits::MessageAttachmentStore;

#[derive(Clone)]
pub struct SqlMessageAttachmentStore {
    pool: AnyPool,
    dialect: Dialect,
    logger: StoreLogger,
}

/// Association rows matching `column = value`, oldest first
pub(crate) async fn links_where(
    pool: &AnyPool,
    logger: &StoreLogger,
    column: &'static str,
    value: &str,
) -> Result<Vec<MessageAttachment>> {
    let sql = format!("SELECT {MESSAGE_ATTACHMENT_COLUMNS} FROM message_attachments WHERE {column} = ? ORDER BY id");
    let rows = sqlx::query(&sql).bind(value).fetch_all(pool).await;
    logger
        .or_log("list message attachments", rows)?
        .iter()
        .map(message_attachment_from_row)
        .collect()
}

impl SqlMessageAttachmentStore {
    pub fn new(pool: AnyPool, dialect: Dialect, logger: StoreLogger) -> Self {
        Self { pool, dialect, logger }
    }

    /// Insert with an auto-assigned id, reading the id back on the inserting connection
    async fn insert_auto_id(&self, link: &MessageAttachment) -> Result<u64> {
        let id = match self.dialect {
            Dialect::Sqlite => {
                let id = sqlx::query_scalar::<_, i64>(
                    "INSERT INTO message_attachments (message_id, attachment_id) VALUES (?, ?) RETURNING id",
                )
                .bind(link.message_id.as_str())
                .bind(link.attachment_id.as_str())
                .fetch_one(&self.pool)
                .await;
                self.logger.or_log("create message attachment", id)?
            }
            Dialect::MySql => {
                let mut tx = self
                    .logger
                    .or_log("begin create message attachment", self.pool.begin().await)?;
                let inserted = sqlx::query("INSERT INTO message_attachments (message_id, attachment_id) VALUES (?, ?)")
                    .bind(link.message_id.as_str())
                    .bind(link.attachment_id.as_str())
                    .execute(&mut *tx)
                    .await;
                self.logger.or_log("create message attachment", inserted)?;
                let id = sqlx::query_scalar::<_, i64>("SELECT CAST(LAST_INSERT_ID() AS SIGNED)")
                    .fetch_one(&mut *tx)
                    .await;
                let id = self.logger.or_log("read message attachment id", id)?;
                self.logger.or_log("commit create message attachment", tx.commit().await)?;
                id
            }
        };
        u64::try_from(id).map_err(|_| PersistError::Backend(format!("driver returned association id {id}")))
    }

    async fn delete_where(&self, op: &str, sql: &str, values: &[&str]) -> Result<u64> {
        let mut query = sqlx::query(sql);
        for value in values {
            query = query.bind(*value);
        }
        let result = self.logger.or_log(op, query.execute(&self.pool).await)?;
        self.logger.info(format!("{op}: {} removed", result.rows_affected()));
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MessageAttachmentStore for SqlMessageAttachmentStore {
    async fn create(&self, mut link: MessageAttachment) -> Result<MessageAttachment> {
        if link.id == 0 {
            link.id = self.insert_auto_id(&link).await?;
        } else {
            let id = i64::try_from(link.id)
                .map_err(|_| PersistError::InvalidArgument(format!("association id {} out of range", link.id)))?;
            let result = sqlx::query("INSERT INTO message_attachments (id, message_id, attachment_id) VALUES (?, ?, ?)")
                .bind(id)
                .bind(link.message_id.as_str())
                .bind(link.attachment_id.as_str())
                .execute(&self.pool)
                .await;
            self.logger.or_log("create message attachment", result)?;
        }

        self.logger.info(format!(
            "message attachment created: {} ({} -> {})",
            link.id, link.message_id, link.attachment_id
        ));
        Ok(link)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        let Ok(row_id) = i64::try_from(id) else {
            return Err(self.logger.not_found("message attachment", &id.to_string()));
        };
        let result = sqlx::query("DELETE FROM message_attachments WHERE id = ?")
            .bind(row_id)
            .execute(&self.pool)
            .await;
        if self.logger.or_log("delete message attachment", result)?.rows_affected() == 0 {
            return Err(self.logger.not_found("message attachment", &id.to_string()));
        }
        self.logger.info(format!("message attachment deleted: {id}"));
        Ok(())
    }

    async fn list_by_message(&self, msg_id: &str) -> Result<Vec<MessageAttachment>> {
        let links = links_where(&self.pool, &self.logger, "message_id", msg_id).await?;
        self.logger.debug(format!("message {msg_id} has {} attachment links", links.len()));
        Ok(links)
    }

    async fn list_by_attachment(&self, attach_id: &str) -> Result<Vec<MessageAttachment>> {
        let links = links_where(&self.pool, &self.logger, "attachment_id", attach_id).await?;
        self.logger.debug(format!("attachment {attach_id} has {} message links", links.len()));
        Ok(links)
    }

    async fn delete_by_message_and_attachment(&self, msg_id: &str, attach_id: &str) -> Result<u64> {
        self.delete_where(
            "delete message attachment pair",
            "DELETE FROM message_attachments WHERE message_id = ? AND attachment_id = ?",
            &[msg_id, attach_id],
        )
        .await
    }

    async fn delete_by_message(&self, msg_id: &str) -> Result<u64> {
        self.delete_where(
            "delete message attachments by message",
            "DELETE FROM message_attachments WHERE message_id = ?",
            &[msg_id],
        )
        .await
    }

    async fn delete_by_attachment(&self, attach_id: &str) -> Result<u64> {
        self.delete_where(
            "delete message attachments by attachment",
            "DELETE FROM message_attachments WHERE attachment_id = ?",
            &[attach_id],
        )
        .await
    }
}
