//! # Parley
//!
//! Conversation history for chat applications, behind one storage contract
//! with two interchangeable backends.
//!
//! ## Overview
//!
//! - **Relational backend**: MySQL or SQLite through a pooled `sqlx` connection,
//!   with native indexes, joins and transactions
//! - **Key-value backend**: Redis (or an in-process engine), with ordering and
//!   associations rebuilt from sorted sets and sets
//! - **History facade**: save chat turns and read them back in order
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PersistError> {
//!     let config = ProviderConfig::new("sqlite://parley.db?mode=rwc", "sqlite");
//!     let history = History::connect(&config).await?;
//!
//!     history.save_message(&Message::human("Hello!"), "conversation-123").await?;
//!     history.save_message(&Message::ai("Hi! How can I help?"), "conversation-123").await?;
//!
//!     for turn in history.get_history("conversation-123", 0).await? {
//!         println!("{}: {}", turn.role(), turn.text());
//!     }
//!
//!     history.close().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`parley-types`**: chat-turn types (`Message`, `Role`, `Content`)
//! - **`parley-persist`**: entity model, store traits, both backends and the provider factory
//! - **`parley`**: the [`History`] facade and re-exports
//!
//! ## License
//!
//! MIT

pub mod history;
pub mod prelude;

pub use history::{History, DEFAULT_HISTORY_LIMIT};

pub use parley_types::{Content, ContentPart, Message, Role};

pub use parley_persist::{
    create_provider, Attachment, AttachmentStore, BackendKind, Conversation, ConversationStore, DBMessage,
    LogLevel, MessageAttachment, MessageAttachmentStore, MessageStore, PersistError, PoolConfig, Provider,
    ProviderConfig, StoreLogger,
};

#[cfg(feature = "sql")]
pub use parley_persist::SqlProvider;

pub use parley_persist::{KvEngine, KvProvider, MemoryEngine};
