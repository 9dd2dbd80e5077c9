//! Structural similarity engine
//!
//! Three sub-methods behind one dispatch: the feature syntax-tree
//! comparison, Rabin-Karp greedy string tiling, and the generic node-type
//! overlap. The hybrid combinator weights whichever sub-methods carry a
//! non-zero weight; weight validation happened at config load.

pub mod features;
pub mod gst;
pub mod node_types;

use std::sync::Arc;

use crate::config::{SimilarityConfig, StructuralMethod};
use crate::parsing::{Language, ParserPool};
use crate::shared::models::{StructuralBreakdown, StructuralScore};

pub use features::{FeatureAnalyzer, TreeFeatures};
pub use gst::{GstAnalyzer, TileMatch};
pub use node_types::{NodeTypeAnalyzer, NodeTypeDetail};

/// Method dispatch over the three structural analyzers
pub struct StructuralAnalyzer {
    method: StructuralMethod,
    features: FeatureAnalyzer,
    gst: GstAnalyzer,
    node_types: NodeTypeAnalyzer,
}

impl StructuralAnalyzer {
    pub fn new(config: &SimilarityConfig, pool: Arc<ParserPool>) -> Self {
        Self {
            method: config.structural.clone(),
            features: FeatureAnalyzer::new(config.feature_weights, Arc::clone(&pool)),
            gst: GstAnalyzer::new(config.gst),
            node_types: NodeTypeAnalyzer::new(pool),
        }
    }

    /// Structural similarity of one pair, in [0, 100]
    pub fn compute(&self, code1: &str, code2: &str, language: Language) -> StructuralScore {
        match &self.method {
            StructuralMethod::FeatureAst => StructuralScore {
                score: self.features.compute_similarity(code1, code2, language),
                method: self.method.name().to_string(),
                breakdown: None,
            },
            StructuralMethod::Gst => StructuralScore {
                score: self.gst.compute_similarity(code1, code2),
                method: self.method.name().to_string(),
                breakdown: None,
            },
            StructuralMethod::NodeType => StructuralScore {
                score: self.node_types.compute_similarity(code1, code2, language),
                method: self.method.name().to_string(),
                breakdown: None,
            },
            StructuralMethod::Hybrid { weights } => {
                let mut breakdown = StructuralBreakdown::default();
                let mut score = 0.0;

                if weights.node_type > 0.0 {
                    let s = self.node_types.compute_similarity(code1, code2, language);
                    score += s * weights.node_type;
                    breakdown.node_type = Some(s);
                }
                if weights.feature_ast > 0.0 {
                    let s = self.features.compute_similarity(code1, code2, language);
                    score += s * weights.feature_ast;
                    breakdown.feature_ast = Some(s);
                }
                if weights.gst > 0.0 {
                    let s = self.gst.compute_similarity(code1, code2);
                    score += s * weights.gst;
                    breakdown.gst = Some(s);
                }

                StructuralScore {
                    score,
                    method: self.method.name().to_string(),
                    breakdown: Some(breakdown),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HybridWeights;

    fn analyzer(method: StructuralMethod) -> StructuralAnalyzer {
        let config = SimilarityConfig {
            structural: method,
            ..SimilarityConfig::default()
        };
        StructuralAnalyzer::new(&config, ParserPool::shared())
    }

    #[test]
    fn test_hybrid_reports_breakdown() {
        let a = analyzer(StructuralMethod::default());
        let code = "def f():\n    return 1\n";
        let result = a.compute(code, code, Language::Python);
        assert_eq!(result.method, "hybrid");
        let breakdown = result.breakdown.unwrap();
        assert!(breakdown.node_type.is_some());
        assert!(breakdown.feature_ast.is_some());
        assert!(breakdown.gst.is_some());
        assert!((result.score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weight_disables_sub_method() {
        let a = analyzer(StructuralMethod::Hybrid {
            weights: HybridWeights {
                node_type: 0.5,
                feature_ast: 0.5,
                gst: 0.0,
            },
        });
        let code = "def f():\n    return 1\n";
        let result = a.compute(code, code, Language::Python);
        let breakdown = result.breakdown.unwrap();
        assert!(breakdown.gst.is_none());
        assert!((result.score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_method_has_no_breakdown() {
        let a = analyzer(StructuralMethod::Gst);
        let result = a.compute("a b c d", "a b c d", Language::Python);
        assert_eq!(result.method, "gst");
        assert!(result.breakdown.is_none());
        assert!((result.score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_unparseable_pair_degrades_not_panics() {
        let a = analyzer(StructuralMethod::default());
        let result = a.compute("def broken(:", "def f():\n    pass\n", Language::Python);
        // GST still sees raw tokens; tree methods soft-fail to 0
        let breakdown = result.breakdown.unwrap();
        assert_eq!(breakdown.feature_ast, Some(0.0));
        assert!(result.score < 50.0);
    }
}
