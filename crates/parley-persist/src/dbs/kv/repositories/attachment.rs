use std::sync::Arc;

use async_trait::async_trait;

use crate::dbs::kv::engine::KvEngine;
use crate::dbs::kv::keys;
use crate::dbs::kv::repositories::message_attachment::links_in_set;
use crate::dbs::kv::repositories::{encode, load, load_many};
use crate::error::{PersistError, Result};
use crate::join::attachments_for_links;
use crate::logger::StoreLogger;
use crate::models::{now_unix, Attachment};
use crate::traits::AttachmentStore;

#[derive(Clone)]
pub struct KvAttachmentStore {
    engine: Arc<dyn KvEngine>,
    logger: StoreLogger,
}

impl KvAttachmentStore {
    pub fn new(engine: Arc<dyn KvEngine>, logger: StoreLogger) -> Self {
        Self { engine, logger }
    }

    /// Batch fetch in the order of `ids`; ids without a record are skipped
    async fn fetch_many(&self, ids: Vec<String>) -> Result<Vec<Attachment>> {
        let record_keys: Vec<String> = ids.iter().map(|id| keys::attachment(id)).collect();
        load_many(self.engine.as_ref(), &self.logger, &record_keys).await
    }
}

#[async_trait]
impl AttachmentStore for KvAttachmentStore {
    async fn create(&self, mut attachment: Attachment) -> Result<Attachment> {
        attachment.prepare_for_insert(now_unix());
        let data = encode(&self.logger, &attachment)?;

        let written = self.logger.or_log(
            "create attachment",
            self.engine
                .set_nx(&keys::attachment(&attachment.attach_id), &data)
                .await,
        )?;
        if !written {
            self.logger.error(format!("attachment already exists: {}", attachment.attach_id));
            return Err(PersistError::Conflict(format!(
                "attachment {} already exists",
                attachment.attach_id
            )));
        }

        self.logger.info(format!(
            "attachment created: {} ({})",
            attachment.attach_id, attachment.file_name
        ));
        Ok(attachment)
    }

    async fn update(&self, attachment: &Attachment) -> Result<()> {
        let key = keys::attachment(&attachment.attach_id);
        if !self.logger.or_log("check attachment", self.engine.exists(&key).await)? {
            return Err(self.logger.not_found("attachment", &attachment.attach_id));
        }

        let data = encode(&self.logger, attachment)?;
        self.logger
            .or_log("update attachment", self.engine.set(&key, &data).await)?;
        self.logger.info(format!("attachment updated: {}", attachment.attach_id));
        Ok(())
    }

    async fn delete(&self, attach_id: &str) -> Result<()> {
        // associations are left in place; listings skip the dangling ids
        let removed = self.logger.or_log(
            "delete attachment",
            self.engine.del(&keys::attachment(attach_id)).await,
        )?;
        if !removed {
            return Err(self.logger.not_found("attachment", attach_id));
        }
        self.logger.info(format!("attachment deleted: {attach_id}"));
        Ok(())
    }

    async fn get_by_id(&self, attach_id: &str) -> Result<Attachment> {
        load(self.engine.as_ref(), &self.logger, &keys::attachment(attach_id))
            .await?
            .ok_or_else(|| self.logger.not_found("attachment", attach_id))
    }

    async fn list_by_message(&self, msg_id: &str) -> Result<Vec<Attachment>> {
        let links = links_in_set(self.engine.as_ref(), &self.logger, &keys::message_attachments(msg_id)).await?;
        let attachments = attachments_for_links(links, |ids| self.fetch_many(ids)).await?;
        self.logger.debug(format!("message {msg_id} has {} attachments", attachments.len()));
        Ok(attachments)
    }
}
