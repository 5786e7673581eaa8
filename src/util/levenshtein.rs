//! Levenshtein distance algorithms.
//!
//! Distances are computed over bytes, matching the byte-oriented term
//! dictionary. [`LevenshteinRows`] exposes the row-by-row form of the dynamic
//! program so a trie walk can extend a candidate one edge at a time and prune
//! subtrees that can no longer match.

use std::cmp::min;

/// Calculate the Levenshtein distance between two byte strings.
/// This is the minimum number of single-byte edits (insertions, deletions, or substitutions)
/// required to change one into the other.
pub fn levenshtein_distance(s1: &[u8], s2: &[u8]) -> usize {
    if s1.is_empty() {
        return s2.len();
    }
    if s2.is_empty() {
        return s1.len();
    }

    let rows = LevenshteinRows::new(s1);
    let mut row = rows.start();
    for &b in s2 {
        row = rows.step(&row, b);
    }
    rows.distance(&row)
}

/// Calculate Levenshtein distance with a maximum threshold for early termination.
/// Returns None if the distance exceeds the threshold.
pub fn levenshtein_distance_threshold(s1: &[u8], s2: &[u8], threshold: usize) -> Option<usize> {
    // Early termination if length difference exceeds threshold
    if s1.len().abs_diff(s2.len()) > threshold {
        return None;
    }

    let rows = LevenshteinRows::new(s1);
    let mut row = rows.start();
    for &b in s2 {
        row = rows.step(&row, b);
        if !rows.can_match(&row, threshold) {
            return None;
        }
    }

    let distance = rows.distance(&row);
    (distance <= threshold).then_some(distance)
}

/// Incremental Levenshtein rows against a fixed query.
///
/// A row holds, for every prefix of the query, the edit distance to the
/// candidate consumed so far. Rows are plain vectors so callers can keep one
/// per stack frame while walking a tree.
#[derive(Debug, Clone)]
pub struct LevenshteinRows {
    query: Vec<u8>,
}

impl LevenshteinRows {
    /// Create rows for the given query.
    pub fn new(query: &[u8]) -> Self {
        LevenshteinRows {
            query: query.to_vec(),
        }
    }

    /// The query the rows are computed against.
    pub fn query(&self) -> &[u8] {
        &self.query
    }

    /// The row for an empty candidate.
    pub fn start(&self) -> Vec<usize> {
        (0..=self.query.len()).collect()
    }

    /// Extend the candidate by one byte.
    pub fn step(&self, prev: &[usize], byte: u8) -> Vec<usize> {
        let mut row = Vec::with_capacity(prev.len());
        row.push(prev[0] + 1);
        for (j, &q) in self.query.iter().enumerate() {
            let cost = usize::from(q != byte);
            let value = min(
                min(
                    prev[j + 1] + 1, // deletion
                    row[j] + 1,      // insertion
                ),
                prev[j] + cost, // substitution
            );
            row.push(value);
        }
        row
    }

    /// Distance between the query and the candidate the row describes.
    pub fn distance(&self, row: &[usize]) -> usize {
        row[row.len() - 1]
    }

    /// Whether the candidate itself is within `max` edits.
    pub fn is_match(&self, row: &[usize], max: usize) -> bool {
        self.distance(row) <= max
    }

    /// Whether some extension of the candidate could still be within `max` edits.
    pub fn can_match(&self, row: &[usize], max: usize) -> bool {
        row.iter().any(|&d| d <= max)
    }
}
