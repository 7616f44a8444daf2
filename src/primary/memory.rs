//! In-process primary store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashSet;
use parking_lot::RwLock;

use crate::error::Result;
use crate::primary::PrimaryStore;
use crate::record::Post;

/// A primary store held in memory, keyed by post identifier.
///
/// Counts batch lookups so callers can check how often they hit the store.
#[derive(Debug, Default)]
pub struct MemoryPrimaryStore {
    posts: RwLock<BTreeMap<String, Post>>,
    fetch_calls: AtomicUsize,
}

impl MemoryPrimaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts<I: IntoIterator<Item = Post>>(posts: I) -> Self {
        let store = Self::new();
        for post in posts {
            store.upsert(post);
        }
        store
    }

    /// Insert or replace a post.
    pub fn upsert(&self, post: Post) {
        self.posts.write().insert(post.post_id.clone(), post);
    }

    /// Hard-remove a post.
    pub fn remove(&self, id: &str) -> Option<Post> {
        self.posts.write().remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Post> {
        self.posts.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.posts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.read().is_empty()
    }

    /// Number of `fetch_by_ids` calls so far.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl PrimaryStore for MemoryPrimaryStore {
    fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Post>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let wanted: AHashSet<&str> = ids.iter().map(String::as_str).collect();
        // Key order, not request order, like a database `IN` lookup.
        Ok(self
            .posts
            .read()
            .values()
            .filter(|post| post.is_visible() && wanted.contains(post.post_id.as_str()))
            .cloned()
            .collect())
    }

    fn scan_visible(&self) -> Result<Vec<Post>> {
        Ok(self
            .posts
            .read()
            .values()
            .filter(|post| post.is_visible())
            .cloned()
            .collect())
    }
}
