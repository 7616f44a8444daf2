//! Access to the primary store, the authoritative owner of posts.
//!
//! The search engine never writes to the primary store. It reads posts
//! back by identifier to hydrate search hits, and scans visible posts for
//! a bulk reindex.

use crate::error::Result;
use crate::record::Post;

pub mod jsonl;
pub mod memory;

/// Read access to the primary store.
pub trait PrimaryStore: Send + Sync {
    /// Fetch the visible posts with the given identifiers in one lookup.
    /// Missing or hidden posts are simply absent from the result, which may
    /// come back in any order.
    fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Post>>;

    /// Every post that is currently visible (published and not deleted).
    fn scan_visible(&self) -> Result<Vec<Post>>;
}
