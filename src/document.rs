//! The indexed projection of a post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::{
    FIELD_BODY, FIELD_CATEGORY, FIELD_DESCRIPTION, FIELD_OWNER_ID, FIELD_TITLE,
};

/// A denormalized document keyed by the post identifier.
///
/// Every field is always present; absent optional post fields are mapped to
/// empty text before a document is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocument {
    pub id: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub category: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl IndexedDocument {
    /// Text of a term-producing field, by schema field name.
    pub fn field_text(&self, field: &str) -> Option<&str> {
        match field {
            FIELD_TITLE => Some(&self.title),
            FIELD_DESCRIPTION => Some(&self.description),
            FIELD_BODY => Some(&self.body),
            FIELD_CATEGORY => Some(&self.category),
            FIELD_OWNER_ID => Some(&self.owner_id),
            _ => None,
        }
    }

    /// Creation time as epoch milliseconds, the ordered doc value.
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FIELD_CREATED_AT;
    use chrono::TimeZone;

    #[test]
    fn test_field_text() {
        let doc = IndexedDocument {
            id: "p1".to_string(),
            title: "Title".to_string(),
            description: String::new(),
            body: "Body".to_string(),
            category: "Rust".to_string(),
            owner_id: "u1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };

        assert_eq!(doc.field_text(FIELD_TITLE), Some("Title"));
        assert_eq!(doc.field_text(FIELD_DESCRIPTION), Some(""));
        assert_eq!(doc.field_text(FIELD_OWNER_ID), Some("u1"));
        assert_eq!(doc.field_text(FIELD_CREATED_AT), None);
        assert_eq!(doc.created_at_millis(), 1_704_067_200_000);
    }
}
