//! Levenshtein edit distance.
//!
//! Used by fuzzy term matching. All distances are computed over Unicode
//! scalar values, not bytes, so `"café"` and `"cafe"` differ by one edit.

use std::cmp::min;

/// Calculate the Levenshtein distance between two strings.
///
/// This is the minimum number of single-character insertions, deletions or
/// substitutions required to change one string into the other.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    distance_within(&s1_chars, &s2_chars, usize::MAX).unwrap_or(usize::MAX)
}

/// Calculate Levenshtein distance with a maximum threshold for early
/// termination. Returns `None` if the distance exceeds the threshold.
pub fn levenshtein_distance_threshold(s1: &str, s2: &str, threshold: usize) -> Option<usize> {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    distance_within(&s1_chars, &s2_chars, threshold)
}

fn distance_within(s1: &[char], s2: &[char], threshold: usize) -> Option<usize> {
    let len1 = s1.len();
    let len2 = s2.len();

    if len1.abs_diff(len2) > threshold {
        return None;
    }
    if len1 == 0 {
        return Some(len2);
    }
    if len2 == 0 {
        return Some(len1);
    }

    // Only two rows are kept.
    let mut prev_row: Vec<usize> = (0..=len2).collect();
    let mut curr_row = vec![0; len2 + 1];

    for i in 1..=len1 {
        curr_row[0] = i;
        let mut min_in_row = i;

        for j in 1..=len2 {
            let cost = usize::from(s1[i - 1] != s2[j - 1]);

            curr_row[j] = min(
                min(
                    prev_row[j] + 1,     // deletion
                    curr_row[j - 1] + 1, // insertion
                ),
                prev_row[j - 1] + cost, // substitution
            );

            min_in_row = min(min_in_row, curr_row[j]);
        }

        if min_in_row > threshold {
            return None;
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    let distance = prev_row[len2];
    (distance <= threshold).then_some(distance)
}

/// Matches many candidate terms against one query term without
/// re-decoding the query for every comparison.
#[derive(Debug, Clone)]
pub struct LevenshteinMatcher {
    query: String,
    query_chars: Vec<char>,
}

impl LevenshteinMatcher {
    /// Create a matcher for the given query term.
    pub fn new<S: Into<String>>(query: S) -> Self {
        let query = query.into();
        let query_chars = query.chars().collect();
        LevenshteinMatcher { query, query_chars }
    }

    /// The query term.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Length of the query in characters.
    pub fn char_len(&self) -> usize {
        self.query_chars.len()
    }

    /// Distance to `candidate` if it is at most `threshold`.
    pub fn distance_threshold(&self, candidate: &str, threshold: usize) -> Option<usize> {
        let candidate_chars: Vec<char> = candidate.chars().collect();
        distance_within(&self.query_chars, &candidate_chars, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("rust", "rust"), 0);
        assert_eq!(levenshtein_distance("rust", "rest"), 1);
        assert_eq!(levenshtein_distance("café", "cafe"), 1);
    }

    #[test]
    fn test_levenshtein_distance_threshold() {
        assert_eq!(levenshtein_distance_threshold("rust", "rust", 1), Some(0));
        assert_eq!(levenshtein_distance_threshold("rust", "rusty", 1), Some(1));
        assert_eq!(levenshtein_distance_threshold("rust", "trust", 1), Some(1));
        assert_eq!(levenshtein_distance_threshold("rust", "rsut", 1), None);
        assert_eq!(levenshtein_distance_threshold("rust", "rustacean", 1), None);
        assert_eq!(levenshtein_distance_threshold("kitten", "sitting", 3), Some(3));
    }

    #[test]
    fn test_matcher() {
        let matcher = LevenshteinMatcher::new("flex");
        assert_eq!(matcher.query(), "flex");
        assert_eq!(matcher.char_len(), 4);
        assert_eq!(matcher.distance_threshold("flux", 1), Some(1));
        assert_eq!(matcher.distance_threshold("flexbox", 1), None);
    }
}
