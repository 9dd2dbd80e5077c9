//! Run-time configuration
//!
//! Every weight group and threshold the engines read lives here, loaded from
//! YAML and validated exactly once at load time. Weight groups must sum to
//! 1.0 within ±0.01; a violation is a fatal configuration error, never a
//! per-pair condition.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SimcheckError};
use crate::normalize::NormalizationStrategy;

const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Structural method selection. Hybrid carries its own sub-method weights;
/// the single methods stay selectable for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum StructuralMethod {
    FeatureAst,
    Gst,
    NodeType,
    Hybrid {
        #[serde(default)]
        weights: HybridWeights,
    },
}

impl StructuralMethod {
    pub fn name(&self) -> &'static str {
        match self {
            StructuralMethod::FeatureAst => "feature_ast",
            StructuralMethod::Gst => "gst",
            StructuralMethod::NodeType => "node_type",
            StructuralMethod::Hybrid { .. } => "hybrid",
        }
    }
}

impl Default for StructuralMethod {
    fn default() -> Self {
        StructuralMethod::Hybrid {
            weights: HybridWeights::default(),
        }
    }
}

/// Sub-method weights for the hybrid combinator. A weight of 0.0 disables
/// that sub-method entirely (it is not computed).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    pub node_type: f64,
    pub feature_ast: f64,
    pub gst: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            node_type: 0.4,
            feature_ast: 0.3,
            gst: 0.3,
        }
    }
}

impl HybridWeights {
    pub fn sum(&self) -> f64 {
        self.node_type + self.feature_ast + self.gst
    }
}

/// Component weights of the feature syntax-tree method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureWeights {
    pub shape: f64,
    pub control_flow: f64,
    pub calls: f64,
    pub data_flow: f64,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            shape: 0.40,
            control_flow: 0.30,
            calls: 0.20,
            data_flow: 0.10,
        }
    }
}

impl FeatureWeights {
    pub fn sum(&self) -> f64 {
        self.shape + self.control_flow + self.calls + self.data_flow
    }
}

/// Greedy string tiling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GstConfig {
    /// Tiles shorter than this are never claimed
    pub min_match_length: usize,
    /// Rolling hash base
    pub hash_base: u64,
    /// Rolling hash modulus
    pub hash_modulus: u64,
}

impl Default for GstConfig {
    fn default() -> Self {
        Self {
            min_match_length: 3,
            hash_base: 256,
            hash_modulus: 101,
        }
    }
}

/// Fusion weights over the three input signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub lexical: f64,
    pub structural: f64,
    pub semantic: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            lexical: 0.15,
            structural: 0.45,
            semantic: 0.40,
        }
    }
}

impl FusionWeights {
    pub fn sum(&self) -> f64 {
        self.lexical + self.structural + self.semantic
    }
}

/// Thresholds and corrections of the three bias rules.
///
/// Rule conditions always read the original signal values; only the running
/// score is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasConfig {
    /// Lexical-only penalty fires when lexical exceeds this
    pub lexical_high_threshold: f64,
    /// and both structural and semantic are below this
    pub support_low_threshold: f64,
    pub lexical_only_penalty: f64,

    /// Agreement boost fires when structural and semantic both reach
    /// `agreement_threshold * 100` (threshold given as a fraction)
    pub agreement_threshold: f64,
    pub agreement_boost: f64,

    /// Uncertainty penalty fires when the population std dev of the three
    /// signals exceeds this
    pub uncertainty_std_dev: f64,
    pub uncertainty_penalty: f64,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            lexical_high_threshold: 70.0,
            support_low_threshold: 50.0,
            lexical_only_penalty: 15.0,
            agreement_threshold: 0.85,
            agreement_boost: 5.0,
            uncertainty_std_dev: 5.0,
            uncertainty_penalty: 10.0,
        }
    }
}

/// Severity classification thresholds. Both bounds are inclusive on the
/// lower side: a score exactly at `severe` is severe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub severe: f64,
    pub partial: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            severe: 90.0,
            partial: 60.0,
        }
    }
}

/// What the semantic signal degrades to when no collaborator is present or
/// the collaborator fails
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticFallback {
    /// Semantic score of 0
    Zero,
    /// Mirror the lexical score
    Lexical,
    /// A fixed configured score
    Pinned(f64),
}

impl Default for SemanticFallback {
    fn default() -> Self {
        SemanticFallback::Zero
    }
}

/// Semantic collaborator settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    /// Inputs longer than this are truncated before embedding, never rejected
    pub max_input_chars: usize,
    pub fallback: SemanticFallback,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 8192,
            fallback: SemanticFallback::Zero,
        }
    }
}

/// Top-level similarity configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub structural: StructuralMethod,
    pub feature_weights: FeatureWeights,
    pub gst: GstConfig,
    pub fusion: FusionWeights,
    pub bias: BiasConfig,
    pub severity: SeverityThresholds,
    pub semantic: SemanticConfig,
    /// Normalization override; `None` picks the per-language default
    pub normalization: Option<NormalizationStrategy>,
}

impl SimilarityConfig {
    /// Load from a YAML string and validate
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: SimilarityConfig = serde_yaml::from_str(yaml)
            .map_err(|e| SimcheckError::config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file and validate
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Validate weight sums and threshold ordering. Called once at load
    /// time; engines assume a validated config afterwards.
    pub fn validate(&self) -> Result<()> {
        check_unit_sum("fusion weights", self.fusion.sum())?;
        check_unit_sum("feature weights", self.feature_weights.sum())?;
        if let StructuralMethod::Hybrid { weights } = &self.structural {
            check_unit_sum("hybrid weights", weights.sum())?;
            if weights.node_type < 0.0 || weights.feature_ast < 0.0 || weights.gst < 0.0 {
                return Err(SimcheckError::config("hybrid weights must be non-negative"));
            }
        }

        if self.gst.min_match_length < 1 {
            return Err(SimcheckError::config("gst min_match_length must be >= 1"));
        }
        if self.gst.hash_base < 2 || self.gst.hash_modulus < 2 {
            return Err(SimcheckError::config(
                "gst hash base and modulus must be >= 2",
            ));
        }

        if !(0.0..=100.0).contains(&self.severity.partial)
            || !(0.0..=100.0).contains(&self.severity.severe)
        {
            return Err(SimcheckError::config(
                "severity thresholds must lie in [0, 100]",
            ));
        }
        if self.severity.partial >= self.severity.severe {
            return Err(SimcheckError::config(
                "severity partial threshold must be below severe threshold",
            ));
        }

        if !(0.0..=1.0).contains(&self.bias.agreement_threshold) {
            return Err(SimcheckError::config(
                "agreement_threshold is a fraction in [0, 1]",
            ));
        }

        if self.semantic.max_input_chars == 0 {
            return Err(SimcheckError::config("semantic max_input_chars must be > 0"));
        }

        Ok(())
    }
}

fn check_unit_sum(name: &str, sum: f64) -> Result<()> {
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(SimcheckError::config(format!(
            "{name} must sum to 1.0 (got {sum:.4})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimilarityConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_method_is_hybrid() {
        let config = SimilarityConfig::default();
        assert_eq!(config.structural.name(), "hybrid");
        if let StructuralMethod::Hybrid { weights } = config.structural {
            assert!((weights.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bad_fusion_weights_are_fatal() {
        let mut config = SimilarityConfig::default();
        config.fusion.lexical = 0.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SimcheckError::Config(_)));
    }

    #[test]
    fn test_weight_sum_tolerance() {
        let mut config = SimilarityConfig::default();
        // 0.155 + 0.45 + 0.40 = 1.005, inside the ±0.01 band
        config.fusion.lexical = 0.155;
        assert!(config.validate().is_ok());
        config.fusion.lexical = 0.17;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_severity_ordering_enforced() {
        let mut config = SimilarityConfig::default();
        config.severity.partial = 95.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gst_bounds() {
        let mut config = SimilarityConfig::default();
        config.gst.min_match_length = 0;
        assert!(config.validate().is_err());

        let mut config = SimilarityConfig::default();
        config.gst.hash_modulus = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r#"
structural:
  name: gst
gst:
  min_match_length: 5
fusion:
  lexical: 0.2
  structural: 0.4
  semantic: 0.4
"#;
        let config = SimilarityConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.structural, StructuralMethod::Gst);
        assert_eq!(config.gst.min_match_length, 5);
        assert!((config.fusion.lexical - 0.2).abs() < 1e-9);
        // Unspecified groups keep their defaults
        assert!((config.feature_weights.shape - 0.40).abs() < 1e-9);
    }

    #[test]
    fn test_yaml_hybrid_weights() {
        let yaml = r#"
structural:
  name: hybrid
  weights:
    node_type: 0.5
    feature_ast: 0.5
    gst: 0.0
"#;
        let config = SimilarityConfig::from_yaml_str(yaml).unwrap();
        if let StructuralMethod::Hybrid { weights } = config.structural {
            assert_eq!(weights.gst, 0.0);
        } else {
            panic!("expected hybrid");
        }
    }

    #[test]
    fn test_unknown_method_name_is_fatal() {
        let yaml = "structural:\n  name: token_soup\n";
        assert!(SimilarityConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_semantic_fallback_pinned() {
        let yaml = "semantic:\n  fallback: !pinned 40.0\n";
        let config = SimilarityConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.semantic.fallback, SemanticFallback::Pinned(40.0));
    }
}
