//! Relational backend over a `sqlx` `AnyPool` (MySQL or SQLite)

mod client;
pub(crate) mod dialect;
mod models;
mod repositories;

pub use client::{init_schema, SqlProvider};
pub use dialect::Dialect;
pub use repositories::{SqlAttachmentStore, SqlConversationStore, SqlMessageAttachmentStore, SqlMessageStore};
