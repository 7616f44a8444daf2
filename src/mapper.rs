//! Maps primary records to indexed documents.
//!
//! Mapping applies the visibility predicate: only published, non-deleted
//! posts produce a document. Everything else maps to [`Mapped::Skip`], which
//! the synchronizer reads as "do not index, and remove if present".

use crate::document::IndexedDocument;
use crate::record::Post;

/// Outcome of mapping one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped {
    Document(IndexedDocument),
    Skip,
}

impl Mapped {
    pub fn is_skip(&self) -> bool {
        matches!(self, Mapped::Skip)
    }
}

/// Converts posts into the document shape the index stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentMapper;

impl DocumentMapper {
    pub fn new() -> Self {
        DocumentMapper
    }

    /// Map a post. Total: never fails, and optional fields become empty text.
    pub fn map(&self, post: &Post) -> Mapped {
        if !post.is_visible() {
            return Mapped::Skip;
        }

        Mapped::Document(IndexedDocument {
            id: post.post_id.clone(),
            title: post.title.clone(),
            description: post.description.clone().unwrap_or_default(),
            body: post.content.clone().unwrap_or_default(),
            category: post.category.clone(),
            owner_id: post.user_id.clone(),
            created_at: post.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_visible_post() {
        let post = Post::new("p1", "u9", "Async Rust", "Programming")
            .with_content("Futures and executors");

        match DocumentMapper::new().map(&post) {
            Mapped::Document(doc) => {
                assert_eq!(doc.id, "p1");
                assert_eq!(doc.owner_id, "u9");
                assert_eq!(doc.body, "Futures and executors");
                assert_eq!(doc.description, "");
                assert_eq!(doc.category, "Programming");
                assert_eq!(doc.created_at, post.created_at);
            }
            Mapped::Skip => panic!("visible post must map to a document"),
        }
    }

    #[test]
    fn test_map_invisible_posts() {
        let mapper = DocumentMapper::new();
        let post = Post::new("p1", "u1", "Draft", "misc");

        assert!(mapper.map(&post.clone().published(false)).is_skip());
        assert!(mapper.map(&post.clone().deleted(true)).is_skip());
        assert!(
            mapper
                .map(&post.published(true).deleted(true))
                .is_skip()
        );
    }
}
