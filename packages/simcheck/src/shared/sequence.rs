//! Sequence and set metrics
//!
//! LCS-based sequence similarity, Jaccard over sets, and the population
//! standard deviation used by the uncertainty bias rule. All normalized
//! results lie in [0.0, 1.0].

use std::collections::HashSet;
use std::hash::{BuildHasher, Hash};

/// Length of the longest common subsequence of two slices.
///
/// Two-row Wagner-Fischer-style DP: O(m*n) time, O(min(m, n)) space.
pub fn lcs_length<T: PartialEq>(seq1: &[T], seq2: &[T]) -> usize {
    // Keep the shorter sequence on the row axis
    let (short, long) = if seq1.len() <= seq2.len() {
        (seq1, seq2)
    } else {
        (seq2, seq1)
    };

    if short.is_empty() {
        return 0;
    }

    let mut prev_row = vec![0usize; short.len() + 1];
    let mut curr_row = vec![0usize; short.len() + 1];

    for item_long in long {
        for (j, item_short) in short.iter().enumerate() {
            curr_row[j + 1] = if item_long == item_short {
                prev_row[j] + 1
            } else {
                prev_row[j + 1].max(curr_row[j])
            };
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[short.len()]
}

/// LCS length divided by the longer sequence's length.
///
/// Returns 0.0 when either sequence is empty.
pub fn sequence_similarity<T: PartialEq>(seq1: &[T], seq2: &[T]) -> f64 {
    if seq1.is_empty() || seq2.is_empty() {
        return 0.0;
    }
    let max_length = seq1.len().max(seq2.len());
    lcs_length(seq1, seq2) as f64 / max_length as f64
}

/// Sequence similarity with the both-empty convention used by the
/// control-flow comparison: 1.0 when both sides are empty, 0.0 when exactly
/// one side is empty.
pub fn normalized_lcs<T: PartialEq>(seq1: &[T], seq2: &[T]) -> f64 {
    match (seq1.is_empty(), seq2.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => sequence_similarity(seq1, seq2),
    }
}

/// Jaccard similarity coefficient: |A ∩ B| / |A ∪ B|.
///
/// Both-empty yields 1.0; exactly one empty yields 0.0.
pub fn jaccard_similarity<T, S>(set_a: &HashSet<T, S>, set_b: &HashSet<T, S>) -> f64
where
    T: Eq + Hash,
    S: BuildHasher,
{
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(set_b).count();
    let union = set_a.union(set_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Population standard deviation (divisor n, not n-1).
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcs_identical() {
        let a = ["if", "for", "while"];
        assert_eq!(lcs_length(&a, &a), 3);
    }

    #[test]
    fn test_lcs_disjoint() {
        assert_eq!(lcs_length(&["a", "b"], &["c", "d"]), 0);
    }

    #[test]
    fn test_lcs_subsequence() {
        let a = ["a", "b", "c", "d", "e"];
        let b = ["b", "d", "e"];
        assert_eq!(lcs_length(&a, &b), 3);
        // Symmetric
        assert_eq!(lcs_length(&b, &a), 3);
    }

    #[test]
    fn test_sequence_similarity_range() {
        let a = ["x", "y", "z", "w"];
        let b = ["x", "z"];
        let sim = sequence_similarity(&a, &b);
        assert!(sim > 0.0 && sim <= 1.0);
        assert!((sim - 0.5).abs() < 1e-9); // LCS 2 / max len 4
    }

    #[test]
    fn test_sequence_similarity_empty_is_zero() {
        let empty: [&str; 0] = [];
        assert_eq!(sequence_similarity(&empty, &["a"]), 0.0);
        assert_eq!(sequence_similarity(&empty, &empty), 0.0);
    }

    #[test]
    fn test_normalized_lcs_empty_conventions() {
        let empty: [&str; 0] = [];
        assert_eq!(normalized_lcs(&empty, &empty), 1.0);
        assert_eq!(normalized_lcs(&empty, &["a"]), 0.0);
        assert_eq!(normalized_lcs(&["a"], &empty), 0.0);
    }

    #[test]
    fn test_jaccard_basic() {
        let a: std::collections::HashSet<_> = ["f", "g", "h"].into_iter().collect();
        let b: std::collections::HashSet<_> = ["g", "h", "i"].into_iter().collect();
        let sim = jaccard_similarity(&a, &b);
        assert!((sim - 0.5).abs() < 1e-9); // 2 / 4
    }

    #[test]
    fn test_jaccard_empty_conventions() {
        let empty: std::collections::HashSet<&str> = Default::default();
        let some: std::collections::HashSet<_> = ["x"].into_iter().collect();
        assert_eq!(jaccard_similarity(&empty, &empty), 1.0);
        assert_eq!(jaccard_similarity(&empty, &some), 0.0);
    }

    #[test]
    fn test_population_std_dev() {
        assert_eq!(population_std_dev(&[]), 0.0);
        assert_eq!(population_std_dev(&[5.0, 5.0, 5.0]), 0.0);
        // Population std of [2, 4, 4, 4, 5, 5, 7, 9] is exactly 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std_dev(&values) - 2.0).abs() < 1e-9);
    }
}
