//! Read access to the in-memory inverted index, as seen by queries.

use std::ops::Bound;

/// Dense per-index document ordinal. Ordinals only grow between
/// compactions, so ascending ordinal order is insertion order.
pub type DocOrd = u32;

/// One entry of a posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc: DocOrd,
    pub freq: u32,
}

/// Per-field statistics over live documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldStats {
    /// Live documents with at least one term in the field.
    pub doc_count: u64,
    /// Sum of field lengths (in terms) over those documents.
    pub total_length: u64,
}

impl FieldStats {
    /// Average field length, never below 1.
    pub fn avg_length(&self) -> f64 {
        if self.doc_count == 0 {
            1.0
        } else {
            (self.total_length as f64 / self.doc_count as f64).max(1.0)
        }
    }
}

/// Iterator over `(term, postings)` pairs of one field, in term order.
pub type TermIter<'a> = Box<dyn Iterator<Item = (&'a str, &'a [Posting])> + 'a>;

/// Read-only view of an index used to evaluate queries.
///
/// Posting lists may still reference deleted documents until the next
/// compaction; callers must check [`IndexReader::is_live`].
pub trait IndexReader: Send + Sync {
    /// Number of live documents.
    fn doc_count(&self) -> u64;

    /// One past the highest ordinal ever assigned.
    fn max_doc(&self) -> DocOrd;

    /// Whether the ordinal refers to a live document.
    fn is_live(&self, doc: DocOrd) -> bool;

    /// External identifier of a live document.
    fn doc_id(&self, doc: DocOrd) -> Option<&str>;

    /// Posting list of an exact term.
    fn postings(&self, field: &str, term: &str) -> Option<&[Posting]>;

    /// Terms of a field within a range, in term order.
    fn term_range<'a>(&'a self, field: &str, lower: Bound<&str>, upper: Bound<&str>)
    -> TermIter<'a>;

    /// All terms of a field, in term order.
    fn terms<'a>(&'a self, field: &str) -> TermIter<'a> {
        self.term_range(field, Bound::Unbounded, Bound::Unbounded)
    }

    /// Terms of a field starting with `prefix`, in term order.
    fn terms_with_prefix<'a>(&'a self, field: &str, prefix: &'a str) -> TermIter<'a> {
        Box::new(
            self.term_range(field, Bound::Included(prefix), Bound::Unbounded)
                .take_while(move |(term, _)| term.starts_with(prefix)),
        )
    }

    /// Statistics of a field.
    fn field_stats(&self, field: &str) -> FieldStats;

    /// Length in terms of a field in a document.
    fn field_length(&self, doc: DocOrd, field: &str) -> u32;

    /// Number of live documents containing the term.
    fn doc_freq(&self, field: &str, term: &str) -> u64 {
        self.postings(field, term)
            .map(|postings| postings.iter().filter(|p| self.is_live(p.doc)).count() as u64)
            .unwrap_or(0)
    }

    /// Live documents whose creation time lies in `[from, to]` (epoch
    /// milliseconds), in creation order.
    fn created_in_range(&self, from_millis: i64, to_millis: i64) -> Vec<DocOrd>;
}
