//! Resolving ranked identifiers back into primary records.

use ahash::AHashMap;
use log::warn;

use crate::error::Result;
use crate::primary::PrimaryStore;
use crate::record::Post;

/// Resolve `ids` against the primary store in one batch lookup and return
/// the posts in the same order.
///
/// Identifiers the store does not know are dropped, and so are posts the
/// store reports as unpublished or soft-deleted. Each is logged as a
/// consistency anomaly: the index still references a record the primary
/// store no longer shows. The output is always a subsequence of the input
/// order. An empty input performs no lookup.
pub fn hydrate(ids: &[String], store: &dyn PrimaryStore) -> Result<Vec<Post>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut by_id: AHashMap<String, Post> = store
        .fetch_by_ids(ids)?
        .into_iter()
        .map(|post| (post.post_id.clone(), post))
        .collect();

    let mut posts = Vec::with_capacity(ids.len());
    for id in ids {
        match by_id.remove(id) {
            Some(post) if post.is_visible() => posts.push(post),
            Some(_) => warn!("Consistency anomaly: indexed post {id} is no longer visible"),
            None => warn!("Consistency anomaly: indexed post {id} is missing from the primary store"),
        }
    }

    Ok(posts)
}
