use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::config::{BackendKind, PoolConfig, ProviderConfig};
use crate::dbs::sql::dialect::{redact, Dialect};
use crate::dbs::sql::repositories::{
    SqlAttachmentStore, SqlConversationStore, SqlMessageAttachmentStore, SqlMessageStore,
};
use crate::error::Result;
use crate::logger::StoreLogger;
use crate::provider::Provider;
use crate::traits::{AttachmentStore, ConversationStore, MessageAttachmentStore, MessageStore};

/// Relational provider: one pooled connection set shared by the four stores
pub struct SqlProvider {
    pool: AnyPool,
    dialect: Dialect,
    logger: StoreLogger,
    conversations: Arc<SqlConversationStore>,
    messages: Arc<SqlMessageStore>,
    attachments: Arc<SqlAttachmentStore>,
    message_attachments: Arc<SqlMessageAttachmentStore>,
}

impl SqlProvider {
    /// Open the pool and create any missing tables
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let url = config.connection_string.as_str();
        let dialect = Dialect::from_url(url)?;
        let logger = config.logger(dialect.name());

        let pool = pool_options(&config.pool, url).connect(url).await;
        let pool = logger.or_log(&format!("connect to {}", redact(url)), pool)?;

        init_schema(&pool, dialect, &logger).await?;
        logger.info(format!("{} provider ready", dialect.name()));

        Ok(Self::from_pool(pool, dialect, logger))
    }

    /// Wrap an existing pool whose schema is already in place
    pub fn from_pool(pool: AnyPool, dialect: Dialect, logger: StoreLogger) -> Self {
        Self {
            conversations: Arc::new(SqlConversationStore::new(pool.clone(), dialect, logger.clone())),
            messages: Arc::new(SqlMessageStore::new(pool.clone(), logger.clone())),
            attachments: Arc::new(SqlAttachmentStore::new(pool.clone(), logger.clone())),
            message_attachments: Arc::new(SqlMessageAttachmentStore::new(pool.clone(), dialect, logger.clone())),
            pool,
            dialect,
            logger,
        }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

fn pool_options(config: &PoolConfig, url: &str) -> AnyPoolOptions {
    // every connection to an in-memory SQLite database sees its own empty database
    if url.contains(":memory:") || url.contains("mode=memory") {
        return AnyPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .max_lifetime(None::<Duration>)
            .idle_timeout(None::<Duration>)
            .acquire_timeout(config.acquire_timeout());
    }

    AnyPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .max_lifetime(config.max_lifetime())
        .idle_timeout(config.idle_timeout())
        .acquire_timeout(config.acquire_timeout())
}

/// Create tables and indexes; safe to run on every start
pub async fn init_schema(pool: &AnyPool, dialect: Dialect, logger: &StoreLogger) -> Result<()> {
    for statement in dialect.schema() {
        logger.or_log("create schema", sqlx::query(statement).execute(pool).await)?;
    }
    logger.debug(format!("{} schema verified", dialect.name()));
    Ok(())
}

#[async_trait]
impl Provider for SqlProvider {
    fn backend(&self) -> BackendKind {
        BackendKind::Relational
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
        self.pool.close().await;
        self.logger.info(format!("{} provider closed", self.dialect.name()));
        Ok(())
    }
}
