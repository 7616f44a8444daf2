//! Primary store backed by a JSON Lines export.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use log::{info, warn};

use crate::error::{PostSearchError, Result};
use crate::primary::PrimaryStore;
use crate::record::Post;

/// Read-only primary store loaded from a file with one JSON post per line.
///
/// Blank lines are ignored. A line that does not parse is skipped with a
/// warning; a later line for the same `postId` replaces an earlier one.
#[derive(Debug)]
pub struct JsonlPrimaryStore {
    path: PathBuf,
    /// Posts in first-seen order.
    posts: Vec<Post>,
    by_id: AHashMap<String, usize>,
    skipped_lines: usize,
}

impl JsonlPrimaryStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PostSearchError::storage(format!("failed to open records {}: {e}", path.display()))
        })?;

        let mut store = JsonlPrimaryStore {
            path: path.to_path_buf(),
            posts: Vec::new(),
            by_id: AHashMap::new(),
            skipped_lines: 0,
        };

        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<Post>(&line) {
                Ok(post) => store.insert(post),
                Err(e) => {
                    warn!("Skipping {}:{}: {e}", path.display(), number + 1);
                    store.skipped_lines += 1;
                }
            }
        }

        info!(
            "Loaded {} posts from {}",
            store.posts.len(),
            path.display()
        );
        Ok(store)
    }

    fn insert(&mut self, post: Post) {
        match self.by_id.get(&post.post_id) {
            Some(&index) => self.posts[index] = post,
            None => {
                self.by_id.insert(post.post_id.clone(), self.posts.len());
                self.posts.push(post);
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Lines that failed to parse.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

impl PrimaryStore for JsonlPrimaryStore {
    fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Post>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.by_id.get(id).map(|&index| &self.posts[index]))
            .filter(|post| post.is_visible())
            .cloned()
            .collect())
    }

    fn scan_visible(&self) -> Result<Vec<Post>> {
        Ok(self
            .posts
            .iter()
            .filter(|post| post.is_visible())
            .cloned()
            .collect())
    }
}
