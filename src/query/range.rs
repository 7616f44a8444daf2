//! Creation-time range filter.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::{DocScores, Query};

/// Matches documents whose `createdAt` lies in an inclusive range. Either
/// bound may be open. Every match scores the boost, so a zero boost makes
/// a pure filter inside a boolean query.
#[derive(Debug, Clone)]
pub struct DateRangeQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    boost: f32,
}

impl DateRangeQuery {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        DateRangeQuery {
            from,
            to,
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for DateRangeQuery {
    fn execute(&self, reader: &dyn IndexReader) -> Result<DocScores> {
        let from = self.from.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN);
        let to = self.to.map(|t| t.timestamp_millis()).unwrap_or(i64::MAX);

        Ok(reader
            .created_in_range(from, to)
            .into_iter()
            .map(|doc| (doc, self.boost))
            .collect())
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        let bound = |t: Option<DateTime<Utc>>| t.map(|t| t.to_rfc3339()).unwrap_or("*".into());
        format!(
            "createdAt:[{} TO {}]^{}",
            bound(self.from),
            bound(self.to),
            self.boost
        )
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn field(&self) -> Option<&str> {
        Some(crate::schema::FIELD_CREATED_AT)
    }
}
