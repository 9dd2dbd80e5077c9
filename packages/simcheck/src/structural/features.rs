//! Feature-based syntax-tree similarity
//!
//! Extracts three structural features per side (ordered control-flow
//! sequence, called-name set, full node-kind fingerprint) and combines four
//! component scores with configured weights. A parse failure on either side
//! soft-fails the whole comparison to 0.

use std::sync::Arc;

use ahash::AHashSet;
use tracing::debug;
use tree_sitter::Tree;

use crate::config::FeatureWeights;
use crate::parsing::{node_kind_fingerprint, Language, ParserPool};
use crate::shared::sequence::{jaccard_similarity, normalized_lcs, sequence_similarity};

/// Structural features of one parsed submission
#[derive(Debug, Clone, Default)]
pub struct TreeFeatures {
    /// Control-flow node kinds in document order
    pub control_flow: Vec<String>,
    /// Distinct called function/method names
    pub calls: AHashSet<String>,
    /// Every named node kind, depth-first pre-order
    pub fingerprint: Vec<String>,
}

impl TreeFeatures {
    pub fn extract(tree: &Tree, code: &str, language: Language) -> Self {
        let mut control_flow = Vec::new();
        let mut calls = AHashSet::new();

        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    stack.push(child);
                }
            }
            if node.is_error() {
                continue;
            }
            if language.is_control_flow_kind(node.kind()) {
                control_flow.push(node.kind().to_string());
            }
            if let Some(name) = language.call_name(&node, code) {
                calls.insert(name.to_string());
            }
        }

        Self {
            control_flow,
            calls,
            fingerprint: node_kind_fingerprint(tree, language),
        }
    }
}

/// Feature syntax-tree analyzer
pub struct FeatureAnalyzer {
    weights: FeatureWeights,
    pool: Arc<ParserPool>,
}

impl FeatureAnalyzer {
    pub fn new(weights: FeatureWeights, pool: Arc<ParserPool>) -> Self {
        Self { weights, pool }
    }

    /// Weighted feature similarity in [0, 100]; 0 when either side fails to
    /// parse cleanly.
    pub fn compute_similarity(&self, code1: &str, code2: &str, language: Language) -> f64 {
        let tree1 = match self.parse_clean(code1, language) {
            Some(t) => t,
            None => return 0.0,
        };
        let tree2 = match self.parse_clean(code2, language) {
            Some(t) => t,
            None => return 0.0,
        };

        let f1 = TreeFeatures::extract(&tree1, code1, language);
        let f2 = TreeFeatures::extract(&tree2, code2, language);

        let shape = sequence_similarity(&f1.fingerprint, &f2.fingerprint);
        let control_flow = normalized_lcs(&f1.control_flow, &f2.control_flow);
        let calls = jaccard_similarity(&f1.calls, &f2.calls);
        // Simplified proxy over the fingerprint, not a real dependency graph
        let data_flow = sequence_similarity(&f1.fingerprint, &f2.fingerprint);

        let combined = shape * self.weights.shape
            + control_flow * self.weights.control_flow
            + calls * self.weights.calls
            + data_flow * self.weights.data_flow;

        combined * 100.0
    }

    fn parse_clean(&self, code: &str, language: Language) -> Option<Tree> {
        let tree = self.pool.parse(language, code)?;
        if tree.root_node().has_error() {
            debug!(language = language.name(), "syntax errors, feature score soft-fails to 0");
            return None;
        }
        Some(tree)
    }
}
