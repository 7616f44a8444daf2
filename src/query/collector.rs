//! Top-N hit collection.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::index::reader::{DocOrd, IndexReader};
use crate::query::{DocScores, SearchHit, SearchResult};

/// Keeps the best `max_docs` hits by descending score. Equal scores keep
/// the natural index order, lower ordinal first.
#[derive(Debug)]
pub struct TopDocsCollector {
    max_docs: usize,
    /// Worst retained hit on top.
    hits: BinaryHeap<ScoredDoc>,
    total_hits: u64,
}

#[derive(Debug, Clone, Copy)]
struct ScoredDoc {
    doc: DocOrd,
    score: f32,
}

impl ScoredDoc {
    /// Rank order: higher score first, then lower ordinal.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.doc.cmp(&other.doc))
    }
}

impl PartialEq for ScoredDoc {
    fn eq(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    // Greater means ranked later, so the heap top is the worst hit.
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_cmp(other)
    }
}

impl TopDocsCollector {
    pub fn new(max_docs: usize) -> Self {
        TopDocsCollector {
            max_docs,
            hits: BinaryHeap::with_capacity(max_docs.min(1024)),
            total_hits: 0,
        }
    }

    pub fn max_docs(&self) -> usize {
        self.max_docs
    }

    /// Number of documents offered so far.
    pub fn total_hits(&self) -> u64 {
        self.total_hits
    }

    pub fn collect(&mut self, doc: DocOrd, score: f32) {
        self.total_hits += 1;
        if self.max_docs == 0 {
            return;
        }

        let candidate = ScoredDoc { doc, score };
        if self.hits.len() < self.max_docs {
            self.hits.push(candidate);
        } else if let Some(worst) = self.hits.peek() {
            if candidate < *worst {
                self.hits.pop();
                self.hits.push(candidate);
            }
        }
    }

    pub fn collect_all(&mut self, scores: &DocScores) {
        for (doc, score) in scores {
            self.collect(*doc, *score);
        }
    }

    /// Retained hits in rank order.
    pub fn into_sorted(self) -> Vec<(DocOrd, f32)> {
        self.hits
            .into_sorted_vec()
            .into_iter()
            .map(|hit| (hit.doc, hit.score))
            .collect()
    }

    /// Resolve the page starting at `offset` into identifiers. The total
    /// counts every collected hit, not just the page.
    pub fn into_result(self, reader: &dyn IndexReader, offset: usize) -> SearchResult {
        let total = self.total_hits;
        let hits = self
            .into_sorted()
            .into_iter()
            .skip(offset)
            .filter_map(|(doc, score)| {
                reader.doc_id(doc).map(|id| SearchHit {
                    id: id.to_string(),
                    score,
                })
            })
            .collect();

        SearchResult { hits, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::term::test_support::index_of;

    #[test]
    fn test_keeps_best_hits_in_order() {
        let mut collector = TopDocsCollector::new(2);
        collector.collect(0, 1.0);
        collector.collect(1, 3.0);
        collector.collect(2, 2.0);
        collector.collect(3, 0.5);

        assert_eq!(collector.total_hits(), 4);
        assert_eq!(collector.into_sorted(), vec![(1, 3.0), (2, 2.0)]);
    }

    #[test]
    fn test_ties_keep_natural_order() {
        let mut collector = TopDocsCollector::new(3);
        for doc in [4, 2, 7, 1, 5] {
            collector.collect(doc, 1.0);
        }
        let docs: Vec<DocOrd> = collector.into_sorted().into_iter().map(|(d, _)| d).collect();
        assert_eq!(docs, vec![1, 2, 4]);
    }

    #[test]
    fn test_page_resolution() {
        let index = index_of(&[("p1", "a", "", "m"), ("p2", "b", "", "m"), ("p3", "c", "", "m")]);

        let mut collector = TopDocsCollector::new(3);
        collector.collect(0, 1.0);
        collector.collect(1, 3.0);
        collector.collect(2, 2.0);

        let result = collector.into_result(&index, 1);
        assert_eq!(result.total, 3);
        assert_eq!(result.ids(), vec!["p3".to_string(), "p1".to_string()]);
    }

    #[test]
    fn test_zero_capacity_only_counts() {
        let mut collector = TopDocsCollector::new(0);
        collector.collect(0, 1.0);
        assert_eq!(collector.total_hits(), 1);
        assert!(collector.into_sorted().is_empty());
    }
}
