use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BackendKind, ProviderConfig};
use crate::dbs::kv::engine::KvEngine;
use crate::dbs::kv::memory::MemoryEngine;
use crate::dbs::kv::repositories::{
    KvAttachmentStore, KvConversationStore, KvMessageAttachmentStore, KvMessageStore,
};
use crate::error::{PersistError, Result};
use crate::logger::StoreLogger;
use crate::provider::Provider;
use crate::traits::{AttachmentStore, ConversationStore, MessageAttachmentStore, MessageStore};

/// Key-value provider: the four stores share one engine handle
pub struct KvProvider {
    engine: Arc<dyn KvEngine>,
    logger: StoreLogger,
    conversations: Arc<KvConversationStore>,
    messages: Arc<KvMessageStore>,
    attachments: Arc<KvAttachmentStore>,
    message_attachments: Arc<KvMessageAttachmentStore>,
}

impl KvProvider {
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        let engine = open_engine(&config.connection_string).await?;
        let logger = config.logger(engine.name());
        logger.info(format!("{} provider ready", engine.name()));
        Ok(Self::with_engine(engine, logger))
    }

    pub fn with_engine(engine: Arc<dyn KvEngine>, logger: StoreLogger) -> Self {
        Self {
            conversations: Arc::new(KvConversationStore::new(engine.clone(), logger.clone())),
            messages: Arc::new(KvMessageStore::new(engine.clone(), logger.clone())),
            attachments: Arc::new(KvAttachmentStore::new(engine.clone(), logger.clone())),
            message_attachments: Arc::new(KvMessageAttachmentStore::new(engine.clone(), logger.clone())),
            engine,
            logger,
        }
    }

    pub fn engine(&self) -> Arc<dyn KvEngine> {
        self.engine.clone()
    }
}

/// Pick an engine from the connection string scheme
pub async fn open_engine(url: &str) -> Result<Arc<dyn KvEngine>> {
    if url.starts_with("memory:") {
        return Ok(Arc::new(MemoryEngine::new()));
    }
    if url.starts_with("redis://") || url.starts_with("rediss://") || url.starts_with("redis+unix://") {
        return open_redis(url).await;
    }
    Err(PersistError::InvalidArgument(format!(
        "unrecognized key-value connection string: {}",
        url.split("://").next().unwrap_or(url)
    )))
}

#[cfg(feature = "redis")]
async fn open_redis(url: &str) -> Result<Arc<dyn KvEngine>> {
    let engine = crate::dbs::kv::redis_engine::RedisEngine::connect(url).await?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_url: &str) -> Result<Arc<dyn KvEngine>> {
    Err(PersistError::UnsupportedBackend(
        "redis (built without the `redis` feature)".to_string(),
    ))
}

#[async_trait]
impl Provider for KvProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::KeyValue
    }

    fn messages(&self) -> Arc<dyn MessageStore> {
        self.messages.clone()
    }

    fn conversations(&self) -> Arc<dyn ConversationStore> {
        self.conversations.clone()
    }

    fn attachments(&self) -> Arc<dyn AttachmentStore> {
        self.attachments.clone()
    }

    fn message_attachments(&self) -> Arc<dyn MessageAttachmentStore> {
        self.message_attachments.clone()
    }

    async fn close(&self) -> Result<()> {
        self.logger.or_log("close", self.engine.close().await)?;
        self.logger.info(format!("{} provider closed", self.engine.name()));
        Ok(())
    }
}
