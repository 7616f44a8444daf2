//! BM25 scoring.

/// BM25 term frequency saturation.
pub const BM25_K1: f32 = 1.2;

/// BM25 length normalization.
pub const BM25_B: f32 = 0.75;

/// Share of a ranked clause's weight that BM25 may move a match by.
///
/// The rest of the weight is earned by matching at all, so a clause with a
/// higher weight always outranks a lower one whatever the corpus statistics.
pub const RELEVANCE_SPREAD: f32 = 0.1;

/// BM25 scorer for one term in one field.
///
/// Uses the non-negative IDF variant `ln(1 + (N - df + 0.5) / (df + 0.5))`
/// so that very common terms never score below zero.
#[derive(Debug, Clone)]
pub struct BM25Scorer {
    /// Document frequency of the term.
    doc_freq: u64,
    /// Total number of live documents in the index.
    total_docs: u64,
    /// Average length of the field.
    avg_field_length: f64,
    /// Boost factor.
    boost: f32,
}

impl BM25Scorer {
    pub fn new(doc_freq: u64, total_docs: u64, avg_field_length: f64, boost: f32) -> Self {
        BM25Scorer {
            doc_freq,
            total_docs,
            avg_field_length: avg_field_length.max(1.0),
            boost,
        }
    }

    /// Inverse document frequency.
    pub fn idf(&self) -> f32 {
        if self.doc_freq == 0 || self.total_docs == 0 {
            return 0.0;
        }

        let n = self.total_docs as f32;
        let df = self.doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Saturated, length-normalized term frequency.
    pub fn tf(&self, term_freq: f32, field_length: f32) -> f32 {
        if term_freq == 0.0 {
            return 0.0;
        }

        let avg_len = self.avg_field_length as f32;
        let norm_factor = 1.0 - BM25_B + BM25_B * (field_length / avg_len);

        (term_freq * (BM25_K1 + 1.0)) / (term_freq + BM25_K1 * norm_factor)
    }

    /// Score a document given the term frequency and the real field length.
    pub fn score(&self, term_freq: u32, field_length: u32) -> f32 {
        self.boost * self.idf() * self.tf(term_freq as f32, field_length as f32)
    }
}

/// Fold an unbounded BM25 score into `[1 - RELEVANCE_SPREAD, 1)`.
///
/// Monotonic, so better BM25 matches still rank first among matches of the
/// same clause.
pub fn bounded_relevance(score: f32) -> f32 {
    let score = score.max(0.0);
    let saturated = score / (score + 1.0);
    1.0 - RELEVANCE_SPREAD + RELEVANCE_SPREAD * saturated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf_is_never_negative() {
        let rare = BM25Scorer::new(1, 100, 10.0, 1.0);
        let common = BM25Scorer::new(100, 100, 10.0, 1.0);

        assert!(rare.idf() > common.idf());
        assert!(common.idf() > 0.0);
        assert_eq!(BM25Scorer::new(0, 100, 10.0, 1.0).idf(), 0.0);
    }

    #[test]
    fn test_shorter_field_scores_higher() {
        let scorer = BM25Scorer::new(1, 10, 10.0, 1.0);
        assert!(scorer.score(1, 2) > scorer.score(1, 40));
        assert!(scorer.score(3, 10) > scorer.score(1, 10));
        assert_eq!(scorer.score(0, 10), 0.0);
    }

    #[test]
    fn test_boost_scales_linearly() {
        let plain = BM25Scorer::new(2, 10, 5.0, 1.0);
        let boosted = BM25Scorer::new(2, 10, 5.0, 3.0);
        let ratio = boosted.score(1, 5) / plain.score(1, 5);
        assert!((ratio - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_bounded_relevance_stays_in_band() {
        let rare = BM25Scorer::new(1, 1_000, 3.0, 1.0).score(5, 3);
        let common = BM25Scorer::new(1_000, 1_000, 3.0, 1.0).score(1, 3);

        assert!(rare > 10.0 * common);
        assert!(bounded_relevance(rare) > bounded_relevance(common));
        for score in [0.0, common, rare, f32::MAX] {
            let bounded = bounded_relevance(score);
            assert!(bounded >= 1.0 - RELEVANCE_SPREAD);
            assert!(bounded <= 1.0);
        }
    }
}
