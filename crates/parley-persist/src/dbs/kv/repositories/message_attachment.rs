use std::sync::Arc;

use async_trait::async_trait;

use crate::dbs::kv::engine::KvEngine;
use crate::dbs::kv::keys;
use crate::dbs::kv::repositories::{encode, load, load_many};
use crate::error::{PersistError, Result};
use crate::logger::StoreLogger;
use crate::models::MessageAttachment;
use crate::traits::MessageAttachmentStore;

#[derive(Clone)]
pub struct KvMessageAttachmentStore {
    engine: Arc<dyn KvEngine>,
    logger: StoreLogger,
}

/// Association records whose ids are members of `set_key`, by ascending id
pub(crate) async fn links_in_set(
    engine: &dyn KvEngine,
    logger: &StoreLogger,
    set_key: &str,
) -> Result<Vec<MessageAttachment>> {
    let members = logger.or_log("read association set", engine.smembers(set_key).await)?;
    let mut ids = members
        .iter()
        .map(|member| {
            member
                .parse::<u64>()
                .map_err(|_| PersistError::Backend(format!("bad association id {member:?} in {set_key}")))
        })
        .collect::<Result<Vec<_>>>()?;
    ids.sort_unstable();

    let record_keys: Vec<String> = ids.into_iter().map(keys::message_attachment).collect();
    load_many(engine, logger, &record_keys).await
}

impl KvMessageAttachmentStore {
    pub fn new(engine: Arc<dyn KvEngine>, logger: StoreLogger) -> Self {
        Self { engine, logger }
    }

    /// Drop the record and both index memberships
    async fn remove(&self, link: &MessageAttachment) -> Result<()> {
        let member = link.id.to_string();
        self.logger.or_log(
            "unlink message",
            self.engine
                .srem(&keys::message_attachments(&link.message_id), &member)
                .await,
        )?;
        self.logger.or_log(
            "unlink attachment",
            self.engine
                .srem(&keys::attachment_messages(&link.attachment_id), &member)
                .await,
        )?;
        self.logger.or_log(
            "delete message attachment",
            self.engine.del(&keys::message_attachment(link.id)).await,
        )?;
        Ok(())
    }

    async fn next_id(&self) -> Result<u64> {
        let next = self.logger.or_log(
            "allocate association id",
            self.engine.incr(keys::MESSAGE_ATTACHMENT_SEQ).await,
        )?;
        u64::try_from(next).map_err(|_| PersistError::Backend(format!("association counter went negative: {next}")))
    }

    async fn remove_all(&self, op: &str, links: Vec<MessageAttachment>) -> Result<u64> {
        let mut removed = 0;
        for link in &links {
            self.remove(link).await?;
            removed += 1;
        }
        self.logger.info(format!("{op}: {removed} removed"));
        Ok(removed)
    }
}

#[async_trait]
impl MessageAttachmentStore for KvMessageAttachmentStore {
    async fn create(&self, mut link: MessageAttachment) -> Result<MessageAttachment> {
        let auto_id = link.id == 0;
        loop {
            if auto_id {
                link.id = self.next_id().await?;
            }
            let data = encode(&self.logger, &link)?;
            let written = self.logger.or_log(
                "create message attachment",
                self.engine.set_nx(&keys::message_attachment(link.id), &data).await,
            )?;
            if written {
                break;
            }
            if !auto_id {
                self.logger.error(format!("message attachment already exists: {}", link.id));
                return Err(PersistError::Conflict(format!("message attachment {} already exists", link.id)));
            }
            // an explicit create already claimed this counter value
            self.logger.debug(format!("association id {} is taken, drawing another", link.id));
        }

        let member = link.id.to_string();
        self.logger.or_log(
            "link message",
            self.engine
                .sadd(&keys::message_attachments(&link.message_id), &member)
                .await,
        )?;
        self.logger.or_log(
            "link attachment",
            self.engine
                .sadd(&keys::attachment_messages(&link.attachment_id), &member)
                .await,
        )?;

        self.logger.info(format!(
            "message attachment created: {} ({} -> {})",
            link.id, link.message_id, link.attachment_id
        ));
        Ok(link)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        let link: MessageAttachment = load(self.engine.as_ref(), &self.logger, &keys::message_attachment(id))
            .await?
            .ok_or_else(|| self.logger.not_found("message attachment", &id.to_string()))?;
        self.remove(&link).await?;
        self.logger.info(format!("message attachment deleted: {id}"));
        Ok(())
    }

    async fn list_by_message(&self, msg_id: &str) -> Result<Vec<MessageAttachment>> {
        let links = links_in_set(self.engine.as_ref(), &self.logger, &keys::message_attachments(msg_id)).await?;
        self.logger.debug(format!("message {msg_id} has {} attachment links", links.len()));
        Ok(links)
    }

    async fn list_by_attachment(&self, attach_id: &str) -> Result<Vec<MessageAttachment>> {
        let links = links_in_set(self.engine.as_ref(), &self.logger, &keys::attachment_messages(attach_id)).await?;
        self.logger.debug(format!("attachment {attach_id} has {} message links", links.len()));
        Ok(links)
    }

    async fn delete_by_message_and_attachment(&self, msg_id: &str, attach_id: &str) -> Result<u64> {
        let links = self
            .list_by_message(msg_id)
            .await?
            .into_iter()
            .filter(|link| link.attachment_id == attach_id)
            .collect();
        self.remove_all("delete message attachment pair", links).await
    }

    async fn delete_by_message(&self, msg_id: &str) -> Result<u64> {
        let links = self.list_by_message(msg_id).await?;
        self.remove_all("delete message attachments by message", links)
            .await
    }

    async fn delete_by_attachment(&self, attach_id: &str) -> Result<u64> {
        let links = self.list_by_attachment(attach_id).await?;
        self.remove_all("delete message attachments by attachment", links)
            .await
    }
}
