//! Key-value backend
//!
//! Relational features are rebuilt from primitives: each record is a JSON
//! value under `<type>:<id>`, ordering comes from sorted sets and the
//! message/attachment links from two membership sets. Multi-step writes are
//! not atomic; a failure part way leaves the earlier steps applied.

mod client;
mod engine;
pub mod keys;
mod memory;
#[cfg(feature = "redis")]
mod redis_engine;
mod repositories;

pub use client::{open_engine, KvProvider};
pub use engine::KvEngine;
pub use memory::MemoryEngine;
#[cfg(feature = "redis")]
pub use redis_engine::RedisEngine;
pub use repositories::{KvAttachmentStore, KvConversationStore, KvMessageAttachmentStore, KvMessageStore};
