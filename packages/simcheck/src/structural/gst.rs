//! Greedy string tiling with Rabin-Karp acceleration
//!
//! Repeatedly claims the longest run of consecutive unclaimed tokens that
//! both sides share, until the best available run falls below the minimum
//! match length. Ties go to the earliest position in sequence 1, then the
//! earliest in sequence 2; any tie choice yields the same coverage, which is
//! the score contract. A rolling hash prunes candidate windows, but a hash
//! hit is only accepted after exact token comparison.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::GstConfig;
use crate::shared::models::fnv1a_hash;

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+|[+\-*/%=<>!&|^~(){}\[\];,.]").unwrap());

/// One claimed tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileMatch {
    pub start1: usize,
    pub start2: usize,
    pub length: usize,
}

/// Rabin-Karp greedy string tiling analyzer
pub struct GstAnalyzer {
    min_match_length: usize,
    base: u64,
    prime: u64,
}

impl GstAnalyzer {
    pub fn new(config: GstConfig) -> Self {
        Self {
            min_match_length: config.min_match_length.max(1),
            base: config.hash_base,
            prime: config.hash_modulus,
        }
    }

    /// Symmetric coverage score in [0, 100]
    pub fn compute_similarity(&self, code1: &str, code2: &str) -> f64 {
        let tokens1 = tokenize(code1);
        let tokens2 = tokenize(code2);
        if tokens1.is_empty() || tokens2.is_empty() {
            return 0.0;
        }

        let tiles = self.tile(&tokens1, &tokens2);
        let claimed: usize = tiles.iter().map(|t| t.length).sum();

        // Tiles never overlap on either side, so claimed token counts are
        // plain sums.
        let coverage1 = claimed as f64 / tokens1.len() as f64;
        let coverage2 = claimed as f64 / tokens2.len() as f64;
        (coverage1 + coverage2) / 2.0 * 100.0
    }

    /// Run the tiling loop, returning every claimed tile
    pub fn tile(&self, tokens1: &[String], tokens2: &[String]) -> Vec<TileMatch> {
        let hashes1 = token_hashes(tokens1, self.prime);
        let hashes2 = token_hashes(tokens2, self.prime);
        let mut marked1 = vec![false; tokens1.len()];
        let mut marked2 = vec![false; tokens2.len()];
        let mut tiles = Vec::new();

        loop {
            let best = self.longest_unclaimed_match(
                tokens1, tokens2, &hashes1, &hashes2, &marked1, &marked2,
            );
            let tile = match best {
                Some(t) if t.length >= self.min_match_length => t,
                _ => break,
            };
            for k in 0..tile.length {
                marked1[tile.start1 + k] = true;
                marked2[tile.start2 + k] = true;
            }
            tiles.push(tile);
        }

        tiles
    }

    fn longest_unclaimed_match(
        &self,
        tokens1: &[String],
        tokens2: &[String],
        hashes1: &[u64],
        hashes2: &[u64],
        marked1: &[bool],
        marked2: &[bool],
    ) -> Option<TileMatch> {
        let mut best: Option<TileMatch> = None;

        for start1 in 0..tokens1.len() {
            if marked1[start1] {
                continue;
            }
            // Candidate lengths are bounded by the unmarked run at start1
            let run_end = (start1..tokens1.len())
                .take_while(|&i| !marked1[i])
                .last()
                .map(|i| i + 1)
                .unwrap_or(start1);
            let max_here = run_end - start1;
            let floor = best.map(|t| t.length).unwrap_or(self.min_match_length - 1);
            if max_here <= floor {
                continue;
            }

            // Longest first; the first length with a hit wins for this start
            for length in (floor + 1..=max_here).rev() {
                let pattern = &tokens1[start1..start1 + length];
                let pattern_hash = self.sequence_hash(&hashes1[start1..start1 + length]);
                if let Some(start2) = self.find_in_unmarked(
                    pattern,
                    pattern_hash,
                    tokens2,
                    hashes2,
                    marked2,
                    length,
                ) {
                    best = Some(TileMatch {
                        start1,
                        start2,
                        length,
                    });
                    break;
                }
            }
        }

        best
    }

    /// Slide a rolling hash over fully-unmarked windows of `tokens2`,
    /// confirming exact equality on every hash hit.
    fn find_in_unmarked(
        &self,
        pattern: &[String],
        pattern_hash: u64,
        tokens2: &[String],
        hashes2: &[u64],
        marked2: &[bool],
        length: usize,
    ) -> Option<usize> {
        let lead_power = self.power(length - 1);
        let mut run_start = 0;
        while run_start < tokens2.len() {
            if marked2[run_start] {
                run_start += 1;
                continue;
            }
            let run_end = (run_start..tokens2.len())
                .take_while(|&i| !marked2[i])
                .last()
                .map(|i| i + 1)
                .unwrap_or(run_start);

            if run_end - run_start >= length {
                let mut hash = self.sequence_hash(&hashes2[run_start..run_start + length]);
                let mut j = run_start;
                loop {
                    if hash == pattern_hash && tokens2[j..j + length] == *pattern {
                        return Some(j);
                    }
                    if j + length >= run_end {
                        break;
                    }
                    // Roll: drop the leading token, append the next one
                    let lead = mul_mod(hashes2[j], lead_power, self.prime);
                    hash = if hash >= lead {
                        hash - lead
                    } else {
                        self.prime - lead + hash
                    };
                    hash = (mul_mod(hash, self.base, self.prime) + hashes2[j + length])
                        % self.prime;
                    j += 1;
                }
            }
            run_start = run_end;
        }
        None
    }

    fn sequence_hash(&self, token_hashes: &[u64]) -> u64 {
        token_hashes
            .iter()
            .fold(0u64, |acc, h| (mul_mod(acc, self.base, self.prime) + h) % self.prime)
    }

    fn power(&self, exp: usize) -> u64 {
        let mut result = 1u64;
        for _ in 0..exp {
            result = mul_mod(result, self.base, self.prime);
        }
        result
    }
}

/// Widened multiply so large configured moduli cannot overflow
fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    (a as u128 * b as u128 % modulus as u128) as u64
}

/// Flat token sequence: identifier/number words plus operator punctuation
pub fn tokenize(code: &str) -> Vec<String> {
    TOKEN
        .find_iter(code)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn token_hashes(tokens: &[String], prime: u64) -> Vec<u64> {
    tokens
        .iter()
        .map(|t| fnv1a_hash(t.as_bytes()) % prime)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn analyzer() -> GstAnalyzer {
        GstAnalyzer::new(GstConfig::default())
    }

    fn str_tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_identical_code_full_coverage() {
        let code = "def f(x):\n    return x * 2\n";
        let score = analyzer().compute_similarity(code, code);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_code_zero_coverage() {
        let score = analyzer().compute_similarity("alpha beta gamma", "delta epsilon zeta");
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_empty_side_is_zero() {
        assert_eq!(analyzer().compute_similarity("", "x = 1"), 0.0);
        assert_eq!(analyzer().compute_similarity("", ""), 0.0);
    }

    #[test]
    fn test_short_matches_ignored() {
        // Common run of length 2 < min_match_length 3
        let score = analyzer().compute_similarity("a b x y z", "a b p q r");
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_longest_tile_claimed_first() {
        let t1 = str_tokens(&["a", "b", "c", "d", "x", "a", "b", "c"]);
        let t2 = str_tokens(&["a", "b", "c", "a", "b", "c", "d"]);
        let tiles = analyzer().tile(&t1, &t2);
        assert_eq!(tiles[0].length, 4); // a b c d
        assert_eq!(tiles[0].start1, 0);
        assert_eq!(tiles[0].start2, 3);
    }

    #[test]
    fn test_reordered_blocks_still_covered() {
        let t1 = str_tokens(&["p", "q", "r", "u", "v", "w"]);
        let t2 = str_tokens(&["u", "v", "w", "p", "q", "r"]);
        let tiles = analyzer().tile(&t1, &t2);
        let claimed: usize = tiles.iter().map(|t| t.length).sum();
        assert_eq!(claimed, 6);
    }

    #[test]
    fn test_tiles_never_overlap() {
        let t1 = str_tokens(&["a", "b", "c", "a", "b", "c", "a", "b", "c"]);
        let t2 = str_tokens(&["a", "b", "c", "a", "b", "c"]);
        let tiles = analyzer().tile(&t1, &t2);
        let mut seen1 = vec![false; t1.len()];
        let mut seen2 = vec![false; t2.len()];
        for tile in &tiles {
            for k in 0..tile.length {
                assert!(!seen1[tile.start1 + k]);
                assert!(!seen2[tile.start2 + k]);
                seen1[tile.start1 + k] = true;
                seen2[tile.start2 + k] = true;
            }
        }
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("x += y;");
        assert_eq!(tokens, vec!["x", "+", "=", "y", ";"]);
    }

    proptest! {
        #[test]
        fn prop_score_in_range(
            a in proptest::collection::vec("[a-d]", 0..30),
            b in proptest::collection::vec("[a-d]", 0..30),
        ) {
            let analyzer = analyzer();
            let tiles = analyzer.tile(&a, &b);
            let claimed: usize = tiles.iter().map(|t| t.length).sum();
            prop_assert!(claimed <= a.len().min(b.len()));
            for t in &tiles {
                prop_assert!(t.length >= 3);
                prop_assert_eq!(&a[t.start1..t.start1 + t.length], &b[t.start2..t.start2 + t.length]);
            }
        }

        #[test]
        fn prop_self_similarity_is_full(code in "[a-z ]{10,60}") {
            let analyzer = analyzer();
            let tokens = tokenize(&code);
            prop_assume!(tokens.len() >= 3);
            let score = analyzer.compute_similarity(&code, &code);
            prop_assert!((score - 100.0).abs() < 1e-9);
        }
    }
}
