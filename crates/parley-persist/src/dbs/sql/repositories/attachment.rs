use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::AnyPool;

use crate::dbs::sql::dialect::placeholders;
use crate::dbs::sql::models::{attachment_from_row, ATTACHMENT_COLUMNS};
use crate::dbs::sql::repositories::message_attachment::links_where;
use crate::error::Result;
use crate::join::attachments_for_links;
use crate::logger::StoreLogger;
use crate::models::{now_unix, Attachment};
use crate::traits::AttachmentStore;

#[derive(Clone)]
pub struct SqlAttachmentStore {
    pool: AnyPool,
    logger: StoreLogger,
}

impl SqlAttachmentStore {
    pub fn new(pool: AnyPool, logger: StoreLogger) -> Self {
        Self { pool, logger }
    }

    async fn find(&self, attach_id: &str) -> Result<Option<Attachment>> {
        let sql = format!("SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE attach_id = ?");
        let row = sqlx::query(&sql).bind(attach_id).fetch_optional(&self.pool).await;
        self.logger
            .or_log("get attachment", row)?
            .map(|row| attachment_from_row(&row))
            .transpose()
    }

    /// Batch fetch by id, returned in the order of `ids`; unknown ids are skipped
    async fn fetch_many(&self, ids: Vec<String>) -> Result<Vec<Attachment>> {
        let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE attach_id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in &ids {
            query = query.bind(id.as_str());
        }
        let rows = self.logger.or_log("fetch attachments", query.fetch_all(&self.pool).await)?;

        let mut by_id = rows
            .iter()
            .map(attachment_from_row)
            .map(|attachment| attachment.map(|a| (a.attach_id.clone(), a)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

#[async_trait]
impl AttachmentStore for SqlAttachmentStore {
    async fn create(&self, mut attachment: Attachment) -> Result<Attachment> {
        attachment.prepare_for_insert(now_unix());

        let sql = format!("INSERT INTO attachments ({ATTACHMENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)");
        let result = sqlx::query(&sql)
            .bind(attachment.attach_id.as_str())
            .bind(attachment.attachment_type.as_str())
            .bind(attachment.file_name.as_str())
            .bind(attachment.file_size)
            .bind(attachment.storage_type.as_str())
            .bind(attachment.storage_path.as_str())
            .bind(attachment.mime_type.as_str())
            .bind(attachment.created_at)
            .execute(&self.pool)
            .await;
        self.logger.or_log("create attachment", result)?;

        self.logger.info(format!(
            "attachment created: {} ({})",
            attachment.attach_id, attachment.file_name
        ));
        Ok(attachment)
    }

    async fn update(&self, attachment: &Attachment) -> Result<()> {
        let result = sqlx::query(
            "UPDATE attachments SET attachment_type = ?, file_name = ?, file_size = ?, storage_type = ?, \
             storage_path = ?, mime_type = ?, created_at = ? WHERE attach_id = ?",
        )
        .bind(attachment.attachment_type.as_str())
        .bind(attachment.file_name.as_str())
        .bind(attachment.file_size)
        .bind(attachment.storage_type.as_str())
        .bind(attachment.storage_path.as_str())
        .bind(attachment.mime_type.as_str())
        .bind(attachment.created_at)
        .bind(attachment.attach_id.as_str())
        .execute(&self.pool)
        .await;
        let result = self.logger.or_log("update attachment", result)?;

        if result.rows_affected() == 0 && self.find(&attachment.attach_id).await?.is_none() {
            return Err(self.logger.not_found("attachment", &attachment.attach_id));
        }
        self.logger.info(format!("attachment updated: {}", attachment.attach_id));
        Ok(())
    }

    async fn delete(&self, attach_id: &str) -> Result<()> {
        let mut tx = self.logger.or_log("begin delete attachment", self.pool.begin().await)?;

        let links = sqlx::query("DELETE FROM message_attachments WHERE attachment_id = ?")
            .bind(attach_id)
            .execute(&mut *tx)
            .await;
        self.logger.or_log("delete attachment links", links)?;

        let removed = sqlx::query("DELETE FROM attachments WHERE attach_id = ?")
            .bind(attach_id)
            .execute(&mut *tx)
            .await;
        if self.logger.or_log("delete attachment", removed)?.rows_affected() == 0 {
            return Err(self.logger.not_found("attachment", attach_id));
        }

        self.logger.or_log("commit delete attachment", tx.commit().await)?;
        self.logger.info(format!("attachment deleted: {attach_id}"));
        Ok(())
    }

    async fn get_by_id(&self, attach_id: &str) -> Result<Attachment> {
        self.find(attach_id)
            .await?
            .ok_or_else(|| self.logger.not_found("attachment", attach_id))
    }

    async fn list_by_message(&self, msg_id: &str) -> Result<Vec<Attachment>> {
        let links = links_where(&self.pool, &self.logger, "message_id", msg_id).await?;
        let attachments = attachments_for_links(links, |ids| self.fetch_many(ids)).await?;
        self.logger.debug(format!("message {msg_id} has {} attachments", attachments.len()));
        Ok(attachments)
    }
}
