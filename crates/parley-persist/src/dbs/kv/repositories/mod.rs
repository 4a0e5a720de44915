mod attachment;
mod conversation;
mod message;
mod message_attachment;

pub use attachment::KvAttachmentStore;
pub use conversation::KvConversationStore;
pub use message::KvMessageStore;
pub use message_attachment::KvMessageAttachmentStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::dbs::kv::engine::KvEngine;
use crate::error::Result;
use crate::logger::StoreLogger;

/// Decode the record stored under `key`
pub(crate) async fn load<T: DeserializeOwned>(
    engine: &dyn KvEngine,
    logger: &StoreLogger,
    key: &str,
) -> Result<Option<T>> {
    let raw = logger.or_log("get", engine.get(key).await)?;
    raw.map(|raw| logger.or_log("decode", serde_json::from_str(&raw)))
        .transpose()
}

/// Records under `keys` in key order; absent keys are skipped
pub(crate) async fn load_many<T: DeserializeOwned>(
    engine: &dyn KvEngine,
    logger: &StoreLogger,
    keys: &[String],
) -> Result<Vec<T>> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let values = logger.or_log("mget", engine.mget(keys).await)?;
    values
        .into_iter()
        .flatten()
        .map(|raw| logger.or_log("decode", serde_json::from_str(&raw)))
        .collect()
}

pub(crate) fn encode<T: Serialize>(logger: &StoreLogger, value: &T) -> Result<String> {
    logger.or_log("encode", serde_json::to_string(value))
}

/// Inclusive Redis stop index for an offset/limit page; `limit` must be non-zero
pub(crate) fn page_bounds(offset: usize, limit: usize) -> (isize, isize) {
    let start = isize::try_from(offset).unwrap_or(isize::MAX);
    let stop = start.saturating_add(isize::try_from(limit).unwrap_or(isize::MAX)).saturating_sub(1);
    (start, stop)
}
