//! In-memory inverted index.
//!
//! Each term-producing field has an ordered term dictionary mapping terms to
//! posting lists. Documents are addressed by dense ordinals. Deleting a
//! document only clears its live bit and its statistics; the stale postings
//! are dropped by [`InvertedIndex::compact`].

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use ahash::AHashMap;
use bit_vec::BitVec;
use rayon::prelude::*;

use crate::analysis::analyzer::per_field::PerFieldAnalyzer;
use crate::document::IndexedDocument;
use crate::error::{PostSearchError, Result};
use crate::index::reader::{DocOrd, FieldStats, IndexReader, Posting, TermIter};
use crate::schema::Schema;

/// Terms of one field of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedField {
    pub name: String,
    /// Term frequencies, sorted by term.
    pub term_freqs: Vec<(String, u32)>,
    /// Number of terms in the field.
    pub length: u32,
}

/// A document with every term-producing field analyzed.
///
/// Analysis is the expensive part of indexing and needs no lock, so writers
/// build this before touching the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedDocument {
    pub document: IndexedDocument,
    pub fields: Vec<AnalyzedField>,
}

impl AnalyzedDocument {
    /// Analyze a document with the schema's field analyzers.
    pub fn analyze(
        schema: &Schema,
        analyzer: &PerFieldAnalyzer,
        document: IndexedDocument,
    ) -> Result<Self> {
        let mut fields = Vec::new();

        for field in schema.term_fields() {
            let text = document.field_text(field).ok_or_else(|| {
                PostSearchError::analysis(format!("document has no value for field '{field}'"))
            })?;

            let mut freqs: BTreeMap<String, u32> = BTreeMap::new();
            let mut length = 0u32;
            for term in analyzer.field_terms(field, text)? {
                *freqs.entry(term).or_insert(0) += 1;
                length += 1;
            }

            fields.push(AnalyzedField {
                name: field.to_string(),
                term_freqs: freqs.into_iter().collect(),
                length,
            });
        }

        Ok(AnalyzedDocument { document, fields })
    }

    /// Analyze many documents in parallel, preserving input order.
    pub fn analyze_all(
        schema: &Schema,
        analyzer: &PerFieldAnalyzer,
        documents: Vec<IndexedDocument>,
    ) -> Vec<Result<Self>> {
        documents
            .into_par_iter()
            .map(|document| Self::analyze(schema, analyzer, document))
            .collect()
    }
}

#[derive(Debug, Default)]
struct FieldIndex {
    terms: BTreeMap<String, Vec<Posting>>,
    stats: FieldStats,
}

#[derive(Debug)]
struct StoredDoc {
    analyzed: AnalyzedDocument,
}

impl StoredDoc {
    fn field_length(&self, field: &str) -> u32 {
        self.analyzed
            .fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.length)
            .unwrap_or(0)
    }
}

/// The in-memory index structure.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    fields: AHashMap<String, FieldIndex>,
    docs: Vec<Option<StoredDoc>>,
    live: BitVec,
    ids: AHashMap<String, DocOrd>,
    created_at: BTreeSet<(i64, DocOrd)>,
    deleted: usize,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live document has this identifier.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Number of deleted ordinals whose postings are still present.
    pub fn deleted_count(&self) -> usize {
        self.deleted
    }

    /// Number of distinct terms per field, including terms that only
    /// deleted documents still reference.
    pub fn term_counts(&self) -> BTreeMap<String, usize> {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.terms.len()))
            .collect()
    }

    /// Insert or fully replace a document. A replaced document gets a new,
    /// higher ordinal.
    pub fn upsert(&mut self, analyzed: AnalyzedDocument) {
        self.delete(&analyzed.document.id);

        let ord = self.docs.len() as DocOrd;

        for field in &analyzed.fields {
            let field_index = self.fields.entry(field.name.clone()).or_default();
            if field.length > 0 {
                field_index.stats.doc_count += 1;
                field_index.stats.total_length += u64::from(field.length);
            }
            for (term, freq) in &field.term_freqs {
                field_index
                    .terms
                    .entry(term.clone())
                    .or_default()
                    .push(Posting { doc: ord, freq: *freq });
            }
        }

        self.ids.insert(analyzed.document.id.clone(), ord);
        self.created_at
            .insert((analyzed.document.created_at_millis(), ord));
        self.docs.push(Some(StoredDoc { analyzed }));
        self.live.push(true);
    }

    /// Delete a document by identifier. Returns whether it was present.
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(ord) = self.ids.remove(id) else {
            return false;
        };

        if let Some(stored) = self.docs[ord as usize].take() {
            for field in &stored.analyzed.fields {
                if field.length > 0 {
                    if let Some(field_index) = self.fields.get_mut(&field.name) {
                        field_index.stats.doc_count -= 1;
                        field_index.stats.total_length -= u64::from(field.length);
                    }
                }
            }
            self.created_at
                .remove(&(stored.analyzed.document.created_at_millis(), ord));
        }

        self.live.set(ord as usize, false);
        self.deleted += 1;
        true
    }

    /// Live documents in ordinal order.
    pub fn documents(&self) -> Vec<IndexedDocument> {
        self.docs
            .iter()
            .flatten()
            .map(|stored| stored.analyzed.document.clone())
            .collect()
    }

    /// Stored document by identifier.
    pub fn document(&self, id: &str) -> Option<&IndexedDocument> {
        let ord = *self.ids.get(id)?;
        self.docs[ord as usize]
            .as_ref()
            .map(|stored| &stored.analyzed.document)
    }

    /// Drop deleted ordinals and renumber the survivors densely. Relative
    /// order of live documents is unchanged.
    pub fn compact(&mut self) {
        if self.deleted == 0 {
            return;
        }

        let survivors: Vec<AnalyzedDocument> = std::mem::take(&mut self.docs)
            .into_iter()
            .flatten()
            .map(|stored| stored.analyzed)
            .collect();

        *self = InvertedIndex::new();
        for analyzed in survivors {
            self.upsert(analyzed);
        }
    }
}

impl IndexReader for InvertedIndex {
    fn doc_count(&self) -> u64 {
        self.ids.len() as u64
    }

    fn max_doc(&self) -> DocOrd {
        self.docs.len() as DocOrd
    }

    fn is_live(&self, doc: DocOrd) -> bool {
        self.live.get(doc as usize).unwrap_or(false)
    }

    fn doc_id(&self, doc: DocOrd) -> Option<&str> {
        self.docs
            .get(doc as usize)?
            .as_ref()
            .map(|stored| stored.analyzed.document.id.as_str())
    }

    fn postings(&self, field: &str, term: &str) -> Option<&[Posting]> {
        self.fields
            .get(field)?
            .terms
            .get(term)
            .map(|postings| postings.as_slice())
    }

    fn term_range<'a>(
        &'a self,
        field: &str,
        lower: Bound<&str>,
        upper: Bound<&str>,
    ) -> TermIter<'a> {
        let Some(field_index) = self.fields.get(field) else {
            return Box::new(std::iter::empty());
        };

        // BTreeMap::range panics on an inverted or empty-exclusive range.
        let empty = match (lower, upper) {
            (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
            (Bound::Included(l) | Bound::Excluded(l), Bound::Included(u) | Bound::Excluded(u)) => {
                l > u
            }
            _ => false,
        };
        if empty {
            return Box::new(std::iter::empty());
        }

        Box::new(
            field_index
                .terms
                .range::<str, _>((lower, upper))
                .map(|(term, postings)| (term.as_str(), postings.as_slice())),
        )
    }

    fn field_stats(&self, field: &str) -> FieldStats {
        self.fields
            .get(field)
            .map(|field_index| field_index.stats)
            .unwrap_or_default()
    }

    fn field_length(&self, doc: DocOrd, field: &str) -> u32 {
        self.docs
            .get(doc as usize)
            .and_then(|stored| stored.as_ref())
            .map(|stored| stored.field_length(field))
            .unwrap_or(0)
    }

    fn created_in_range(&self, from_millis: i64, to_millis: i64) -> Vec<DocOrd> {
        if from_millis > to_millis {
            return Vec::new();
        }
        self.created_at
            .range((from_millis, DocOrd::MIN)..=(to_millis, DocOrd::MAX))
            .map(|(_, ord)| *ord)
            .collect()
    }
}
