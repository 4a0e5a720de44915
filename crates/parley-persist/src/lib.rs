pub mod config;
pub mod dbs;
pub mod error;
pub mod logger;
pub mod models;
pub mod provider;
pub mod traits;

mod join;

pub use config::{BackendKind, PoolConfig, ProviderConfig};
pub use dbs::kv::{KvEngine, KvProvider, MemoryEngine};
#[cfg(feature = "sql")]
pub use dbs::sql::SqlProvider;
pub use error::{PersistError, Result};
pub use logger::{LogLevel, StoreLogger};
pub use models::{Attachment, Conversation, DBMessage, MessageAttachment};
pub use provider::{create_provider, Provider};
pub use traits::{AttachmentStore, ConversationStore, MessageAttachmentStore, MessageStore};
