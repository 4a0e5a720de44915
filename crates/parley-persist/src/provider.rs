use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{BackendKind, ProviderConfig};
use crate::dbs::kv::KvProvider;
use crate::error::Result;
use crate::traits::{AttachmentStore, ConversationStore, MessageAttachmentStore, MessageStore};

/// Handle over one backend, exposing its four stores
///
/// Build once with [`create_provider`], share the `Arc`, and call
/// [`Provider::close`] when done.
#[async_trait]
pub trait Provider: Send + Sync {
    fn backend(&self) -> BackendKind;

    fn messages(&self) -> Arc<dyn MessageStore>;

    fn conversations(&self) -> Arc<dyn ConversationStore>;

    fn attachments(&self) -> Arc<dyn AttachmentStore>;

    fn message_attachments(&self) -> Arc<dyn MessageAttachmentStore>;

    /// Release connections held by the backend
    async fn close(&self) -> Result<()>;
}

/// Build the provider named by `config.backend_kind` (relational when empty)
pub async fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match config.kind()? {
        BackendKind::Relational => connect_relational(config).await?,
        BackendKind::KeyValue => Arc::new(KvProvider::connect(config).await?),
    };
    tracing::debug!(backend = provider.backend().as_str(), "provider created");
    Ok(provider)
}

#[cfg(feature = "sql")]
async fn connect_relational(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(crate::dbs::sql::SqlProvider::connect(config).await?))
}

#[cfg(not(feature = "sql"))]
async fn connect_relational(_config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    Err(crate::error::PersistError::UnsupportedBackend(
        "relational (built without the `sql` feature)".to_string(),
    ))
}
