//! Manual join used by both backends: resolve association rows into target ids,
//! then fetch the targets in one batch.

use std::collections::HashSet;
use std::future::Future;

use crate::error::Result;
use crate::models::{Attachment, MessageAttachment};

/// Distinct ids in first-seen order
pub(crate) fn distinct_ids<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Resolve ids out of `links` and hand them to `fetch` as a single batch.
///
/// An empty resolution short-circuits without calling `fetch`.
pub(crate) async fn resolve_then_fetch<L, T, R, F, Fut>(links: Vec<L>, resolve: R, fetch: F) -> Result<Vec<T>>
where
    R: Fn(&L) -> String,
    F: FnOnce(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let ids = distinct_ids(links.iter().map(resolve));
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    fetch(ids).await
}

/// Attachments referenced by `links`, fetched with `fetch`
pub(crate) async fn attachments_for_links<F, Fut>(links: Vec<MessageAttachment>, fetch: F) -> Result<Vec<Attachment>>
where
    F: FnOnce(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<Attachment>>>,
{
    resolve_then_fetch(links, |link| link.attachment_id.clone(), fetch).await
}
