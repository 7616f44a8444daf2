//! The primary record: a post as the primary store holds it.
//!
//! Posts are owned by the primary store; this crate only reads them. The
//! serde shape (camelCase keys) matches the primary store's JSON export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub post_id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub blurred: bool,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub shares_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_scheduled: bool,
}

impl Post {
    /// Create a published, non-deleted post created now.
    pub fn new<S: Into<String>>(post_id: S, user_id: S, title: S, category: S) -> Self {
        let now = Utc::now();
        Post {
            post_id: post_id.into(),
            user_id: user_id.into(),
            title: title.into(),
            description: None,
            content: None,
            category: category.into(),
            media_url: None,
            blurred: false,
            views_count: 0,
            likes_count: 0,
            shares_count: 0,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            is_published: true,
            scheduled_at: None,
            is_scheduled: false,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    /// Mark the post as a draft scheduled for `at`.
    pub fn scheduled(mut self, at: DateTime<Utc>) -> Self {
        self.is_published = false;
        self.is_scheduled = true;
        self.scheduled_at = Some(at);
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.is_published = published;
        self
    }

    pub fn deleted(mut self, deleted: bool) -> Self {
        self.is_deleted = deleted;
        self
    }

    /// Whether the post may appear in search results: published and not
    /// soft-deleted.
    pub fn is_visible(&self) -> bool {
        self.is_published && !self.is_deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_visibility() {
        let post = Post::new("p1", "u1", "Hello", "general");
        assert!(post.is_visible());
        assert!(!post.clone().deleted(true).is_visible());
        assert!(!post.clone().published(false).is_visible());

        let at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let draft = post.scheduled(at);
        assert!(!draft.is_visible());
        assert_eq!(draft.scheduled_at, Some(at));
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "postId": "p1",
            "userId": "u1",
            "title": "Hello",
            "category": "General",
            "likesCount": 3,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-02T10:00:00Z",
            "isPublished": true
        }"#;

        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.post_id, "p1");
        assert_eq!(post.likes_count, 3);
        assert_eq!(post.description, None);
        assert!(post.is_visible());

        let back = serde_json::to_value(&post).unwrap();
        assert_eq!(back["postId"], "p1");
        assert_eq!(back["isDeleted"], false);
    }
}
