//! Generic node-type similarity
//!
//! Language-agnostic fallback: parse both sides, collect the set of distinct
//! grammar node-type labels (error nodes excluded), score the Jaccard
//! overlap. Unsupported languages and parse failures yield an empty label
//! set, which scores 0 against anything.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashSet;
use serde::Serialize;
use tracing::debug;

use crate::normalize::token::decode_literal_escapes;
use crate::parsing::{Language, ParserPool};
use crate::shared::sequence::jaccard_similarity;

/// Node-type analyzer over the shared parser pool
pub struct NodeTypeAnalyzer {
    pool: Arc<ParserPool>,
}

/// Expanded result for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct NodeTypeDetail {
    pub score: f64,
    pub labels1: usize,
    pub labels2: usize,
    pub common: usize,
    pub unique_to_1: usize,
    pub unique_to_2: usize,
    pub parse_success: bool,
    /// First few shared labels, alphabetical
    pub common_labels: Vec<String>,
}

impl NodeTypeAnalyzer {
    pub fn new(pool: Arc<ParserPool>) -> Self {
        Self { pool }
    }

    /// Jaccard of node-type label sets, in [0, 100]
    pub fn compute_similarity(&self, code1: &str, code2: &str, language: Language) -> f64 {
        let labels1 = self.label_set(code1, language);
        let labels2 = self.label_set(code2, language);
        if labels1.is_empty() || labels2.is_empty() {
            debug!(language = language.name(), "empty label set on at least one side");
            return 0.0;
        }
        jaccard_similarity(&labels1, &labels2) * 100.0
    }

    /// Similarity plus set-overlap diagnostics
    pub fn detailed_similarity(
        &self,
        code1: &str,
        code2: &str,
        language: Language,
    ) -> NodeTypeDetail {
        let labels1 = self.label_set(code1, language);
        let labels2 = self.label_set(code2, language);
        if labels1.is_empty() || labels2.is_empty() {
            return NodeTypeDetail {
                score: 0.0,
                labels1: labels1.len(),
                labels2: labels2.len(),
                common: 0,
                unique_to_1: 0,
                unique_to_2: 0,
                parse_success: false,
                common_labels: Vec::new(),
            };
        }

        let common: BTreeSet<&String> = labels1.intersection(&labels2).collect();
        NodeTypeDetail {
            score: jaccard_similarity(&labels1, &labels2) * 100.0,
            labels1: labels1.len(),
            labels2: labels2.len(),
            common: common.len(),
            unique_to_1: labels1.difference(&labels2).count(),
            unique_to_2: labels2.difference(&labels1).count(),
            parse_success: true,
            common_labels: common.into_iter().take(10).cloned().collect(),
        }
    }

    /// Distinct node-type labels of one side. Empty on unsupported language,
    /// parse failure, or a root that is itself an error.
    fn label_set(&self, code: &str, language: Language) -> AHashSet<String> {
        let code = clean_code(code);
        if code.is_empty() {
            return AHashSet::new();
        }
        let tree = match self.pool.parse(language, &code) {
            Some(t) => t,
            None => return AHashSet::new(),
        };
        let root = tree.root_node();
        if root.is_error() {
            return AHashSet::new();
        }

        let mut labels = AHashSet::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !node.is_error() {
                labels.insert(node.kind().to_string());
            }
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    stack.push(child);
                }
            }
        }
        labels
    }
}

/// Decode stored escapes, strip the common leading indentation, and trim.
/// Mirrors the pre-parse cleanup used before node-type extraction.
fn clean_code(code: &str) -> String {
    let code = decode_literal_escapes(code);
    let indent = code
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let dedented: String = code
        .lines()
        .map(|l| if l.len() >= indent { &l[indent..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n");
    dedented.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> NodeTypeAnalyzer {
        NodeTypeAnalyzer::new(ParserPool::shared())
    }

    #[test]
    fn test_identical_code_scores_full() {
        let code = "def f():\n    return 1\n";
        let score = analyzer().compute_similarity(code, code, Language::Python);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_side_scores_zero() {
        assert_eq!(
            analyzer().compute_similarity("", "x = 1", Language::Python),
            0.0
        );
    }

    #[test]
    fn test_cross_language_grammars() {
        let java = "public class A { int f() { return 1; } }";
        let score = analyzer().compute_similarity(java, java, Language::Java);
        assert!((score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_detail_counts() {
        let a = "x = 1\n";
        let b = "x = 1\nif x:\n    pass\n";
        let detail = analyzer().detailed_similarity(a, b, Language::Python);
        assert!(detail.parse_success);
        assert!(detail.common > 0);
        assert!(detail.unique_to_2 > 0);
        assert_eq!(detail.unique_to_1, 0);
        assert!(detail.score > 0.0 && detail.score < 100.0);
    }

    #[test]
    fn test_indented_snippet_is_dedented() {
        // A snippet pasted from inside a function body still parses
        let snippet = "    x = 1\n    y = x + 2\n";
        let score = analyzer().compute_similarity(snippet, "x = 1\ny = x + 2\n", Language::Python);
        assert!((score - 100.0).abs() < 1e-9);
    }
}
