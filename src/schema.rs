//! The fixed field schema of the posts index.
//!
//! The schema is compiled in. It is also written to the index manifest, and
//! an index created under a different schema version refuses to open.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::english::EnglishAnalyzer;
use crate::analysis::analyzer::keyword::KeywordAnalyzer;
use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
use crate::analysis::analyzer::simple::SimpleAnalyzer;
use crate::analysis::analyzer::Analyzer;
use crate::error::{PostSearchError, Result};

/// Version of the compiled-in schema. Bump on any field change.
pub const SCHEMA_VERSION: u32 = 1;

/// Post title.
pub const FIELD_TITLE: &str = "title";
/// Post description.
pub const FIELD_DESCRIPTION: &str = "description";
/// Post body, derived from the post content.
pub const FIELD_BODY: &str = "body";
/// Post category.
pub const FIELD_CATEGORY: &str = "category";
/// Author identifier.
pub const FIELD_OWNER_ID: &str = "ownerId";
/// Creation timestamp.
pub const FIELD_CREATED_AT: &str = "createdAt";

/// Tokenized free-text fields, in ranking order.
pub const TEXT_FIELDS: [&str; 3] = [FIELD_TITLE, FIELD_DESCRIPTION, FIELD_BODY];

/// How a field's value is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Tokenized full text.
    Text,
    /// Whole value as a single term.
    Keyword,
    /// Timestamp, indexed as an ordered per-document value.
    DateTime,
}

/// The analyzer attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    English,
    Keyword,
    KeywordLowercase,
    None,
}

impl AnalyzerKind {
    /// Build the analyzer this kind names.
    pub fn build(self) -> Option<Arc<dyn Analyzer>> {
        match self {
            AnalyzerKind::English => Some(Arc::new(EnglishAnalyzer::new())),
            AnalyzerKind::Keyword => Some(Arc::new(KeywordAnalyzer::new())),
            AnalyzerKind::KeywordLowercase => Some(Arc::new(KeywordAnalyzer::lowercased())),
            AnalyzerKind::None => None,
        }
    }
}

/// Definition of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldKind,
    pub stored: bool,
    pub indexed: bool,
    pub analyzer: AnalyzerKind,
}

impl FieldDefinition {
    fn new(name: &str, kind: FieldKind, analyzer: AnalyzerKind) -> Self {
        FieldDefinition {
            name: name.to_string(),
            kind,
            stored: true,
            indexed: true,
            analyzer,
        }
    }
}

/// The set of fields every indexed document carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub version: u32,
    pub fields: Vec<FieldDefinition>,
}

impl Schema {
    /// The posts schema.
    pub fn posts() -> Self {
        Schema {
            version: SCHEMA_VERSION,
            fields: vec![
                FieldDefinition::new(FIELD_TITLE, FieldKind::Text, AnalyzerKind::English),
                FieldDefinition::new(FIELD_DESCRIPTION, FieldKind::Text, AnalyzerKind::English),
                FieldDefinition::new(FIELD_BODY, FieldKind::Text, AnalyzerKind::English),
                FieldDefinition::new(
                    FIELD_CATEGORY,
                    FieldKind::Keyword,
                    AnalyzerKind::KeywordLowercase,
                ),
                FieldDefinition::new(FIELD_OWNER_ID, FieldKind::Keyword, AnalyzerKind::Keyword),
                FieldDefinition::new(FIELD_CREATED_AT, FieldKind::DateTime, AnalyzerKind::None),
            ],
        }
    }

    /// Get a field definition by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.get_field(name).is_some()
    }

    /// Names of fields that produce index terms, in schema order.
    pub fn term_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|field| field.indexed && field.analyzer != AnalyzerKind::None)
            .map(|field| field.name.as_str())
    }

    /// Build the per-field analyzer for this schema. Fields without an
    /// analyzer fall back to the simple analyzer, which they never reach.
    pub fn analyzer(&self) -> PerFieldAnalyzer {
        let english: Arc<dyn Analyzer> = Arc::new(EnglishAnalyzer::new());
        let mut analyzer = PerFieldAnalyzer::new(Arc::new(SimpleAnalyzer::new()));

        for field in &self.fields {
            let field_analyzer = match field.analyzer {
                AnalyzerKind::English => Some(Arc::clone(&english)),
                other => other.build(),
            };
            if let Some(field_analyzer) = field_analyzer {
                analyzer.add_analyzer(field.name.clone(), field_analyzer);
            }
        }

        analyzer
    }

    /// Fail unless `persisted` (read from an index manifest) matches this
    /// schema exactly.
    pub fn ensure_compatible(&self, persisted: &Schema) -> Result<()> {
        if persisted.version != self.version {
            return Err(PostSearchError::schema(format!(
                "index was created with schema version {}, this build uses version {}",
                persisted.version, self.version
            )));
        }
        if persisted.fields != self.fields {
            return Err(PostSearchError::schema(format!(
                "index fields differ from schema version {}",
                self.version
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posts_schema() {
        let schema = Schema::posts();

        assert_eq!(schema.version, SCHEMA_VERSION);
        assert_eq!(schema.get_field(FIELD_CATEGORY).unwrap().kind, FieldKind::Keyword);
        assert_eq!(
            schema.get_field(FIELD_CREATED_AT).unwrap().kind,
            FieldKind::DateTime
        );
        assert!(!schema.has_field("content"));

        let term_fields: Vec<&str> = schema.term_fields().collect();
        assert_eq!(
            term_fields,
            vec![FIELD_TITLE, FIELD_DESCRIPTION, FIELD_BODY, FIELD_CATEGORY, FIELD_OWNER_ID]
        );
    }

    #[test]
    fn test_schema_analyzers() {
        let analyzer = Schema::posts().analyzer();

        assert_eq!(
            analyzer.field_terms(FIELD_CATEGORY, "Web Dev").unwrap(),
            vec!["web dev"]
        );
        assert_eq!(
            analyzer.field_terms(FIELD_OWNER_ID, "User-7").unwrap(),
            vec!["User-7"]
        );
        assert_eq!(
            analyzer.field_terms(FIELD_BODY, "Writing posts").unwrap(),
            vec!["writing", "post"]
        );
    }

    #[test]
    fn test_schema_compatibility() {
        let schema = Schema::posts();
        assert!(schema.ensure_compatible(&Schema::posts()).is_ok());

        let mut older = Schema::posts();
        older.version = 0;
        let err = schema.ensure_compatible(&older).unwrap_err();
        assert!(matches!(err, PostSearchError::Schema(_)));

        let mut changed = Schema::posts();
        changed.fields.pop();
        assert!(schema.ensure_compatible(&changed).is_err());
    }

    #[test]
    fn test_schema_serde() {
        let json = serde_json::to_string(&Schema::posts()).unwrap();
        assert!(json.contains("\"keyword_lowercase\""));
        let parsed: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Schema::posts());
    }
}
