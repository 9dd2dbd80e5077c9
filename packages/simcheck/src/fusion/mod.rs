//! Score fusion and bias correction
//!
//! Folds the three signals into one verdict: weighted sum, then the three
//! bias rules in fixed order, then a clamp to [0, 100]. Every rule condition
//! reads the original signal values; only the running score mutates. The
//! adjustment log is part of the result contract, not a debug artifact.

use tracing::debug;

use crate::config::{BiasConfig, FusionWeights, SeverityThresholds};
use crate::shared::models::{Adjustment, BiasRule, Severity, SignalScores};
use crate::shared::sequence::population_std_dev;

/// Outcome of one fusion pass
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    /// Weighted sum before bias rules
    pub raw_score: f64,
    /// Bias-adjusted, clamped score
    pub final_score: f64,
    /// Rules that fired, in evaluation order
    pub adjustments: Vec<Adjustment>,
    pub severity: Severity,
}

/// Fusion engine over validated configuration
pub struct FusionEngine {
    weights: FusionWeights,
    bias: BiasConfig,
    severity: SeverityThresholds,
}

impl FusionEngine {
    pub fn new(weights: FusionWeights, bias: BiasConfig, severity: SeverityThresholds) -> Self {
        Self {
            weights,
            bias,
            severity,
        }
    }

    /// Fuse the three signals into a final verdict
    pub fn fuse(&self, signals: SignalScores) -> FusedScore {
        let raw_score = signals.lexical * self.weights.lexical
            + signals.structural * self.weights.structural
            + signals.semantic * self.weights.semantic;

        let mut score = raw_score;
        let mut adjustments = Vec::new();

        // Rule order is fixed; see the individual conditions below.
        if signals.lexical > self.bias.lexical_high_threshold
            && signals.structural < self.bias.support_low_threshold
            && signals.semantic < self.bias.support_low_threshold
        {
            let delta = -self.bias.lexical_only_penalty;
            score += delta;
            adjustments.push(Adjustment {
                rule: BiasRule::LexicalOnlyPenalty,
                delta,
            });
        }

        let agreement_floor = self.bias.agreement_threshold * 100.0;
        if signals.structural >= agreement_floor && signals.semantic >= agreement_floor {
            let delta = self.bias.agreement_boost;
            score += delta;
            adjustments.push(Adjustment {
                rule: BiasRule::AgreementBoost,
                delta,
            });
        }

        let spread =
            population_std_dev(&[signals.lexical, signals.structural, signals.semantic]);
        if spread > self.bias.uncertainty_std_dev {
            let delta = -self.bias.uncertainty_penalty;
            score += delta;
            adjustments.push(Adjustment {
                rule: BiasRule::UncertaintyPenalty,
                delta,
            });
        }

        let final_score = score.clamp(0.0, 100.0);
        if !adjustments.is_empty() {
            debug!(
                raw = raw_score,
                adjusted = final_score,
                rules = adjustments.len(),
                "bias rules fired"
            );
        }

        FusedScore {
            raw_score,
            final_score,
            adjustments,
            severity: self.classify(final_score),
        }
    }

    /// Severity with inclusive lower bounds
    pub fn classify(&self, score: f64) -> Severity {
        if score >= self.severity.severe {
            Severity::Severe
        } else if score >= self.severity.partial {
            Severity::Partial
        } else {
            Severity::Clean
        }
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(
            FusionWeights::default(),
            BiasConfig::default(),
            SeverityThresholds::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn signals(lexical: f64, structural: f64, semantic: f64) -> SignalScores {
        SignalScores {
            lexical,
            structural,
            semantic,
        }
    }

    #[test]
    fn test_weighted_sum() {
        let fused = FusionEngine::default().fuse(signals(50.0, 50.0, 50.0));
        assert!((fused.raw_score - 50.0).abs() < 1e-9);
        assert!(fused.adjustments.is_empty());
        assert!((fused.final_score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_lexical_only_penalty_scenario() {
        // lexical=80, structural=40, semantic=30
        let fused = FusionEngine::default().fuse(signals(80.0, 40.0, 30.0));
        // raw = 80*0.15 + 40*0.45 + 30*0.40 = 42
        assert!((fused.raw_score - 42.0).abs() < 1e-9);
        // std dev of {80, 40, 30} is ~21.6 > 5, so the uncertainty rule also fires
        assert_eq!(
            fused.adjustments.iter().map(|a| a.rule).collect::<Vec<_>>(),
            vec![BiasRule::LexicalOnlyPenalty, BiasRule::UncertaintyPenalty]
        );
        assert!((fused.final_score - 17.0).abs() < 1e-9);
        assert_eq!(fused.severity, Severity::Clean);
    }

    #[test]
    fn test_agreement_boost() {
        let fused = FusionEngine::default().fuse(signals(90.0, 92.0, 91.0));
        assert_eq!(fused.adjustments.len(), 1);
        assert_eq!(fused.adjustments[0].rule, BiasRule::AgreementBoost);
        assert!((fused.adjustments[0].delta - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_agreement_threshold_is_inclusive() {
        let fused = FusionEngine::default().fuse(signals(85.0, 85.0, 85.0));
        assert_eq!(fused.adjustments[0].rule, BiasRule::AgreementBoost);
    }

    #[test]
    fn test_conditions_read_original_signals_not_running_score() {
        // Uniform signals with spread exactly 0: uncertainty never fires
        // even though the boost moved the running score
        let fused = FusionEngine::default().fuse(signals(95.0, 95.0, 95.0));
        assert_eq!(fused.adjustments.len(), 1);
        assert!((fused.final_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_upper() {
        let fused = FusionEngine::default().fuse(signals(100.0, 100.0, 100.0));
        assert!((fused.final_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_lower() {
        // Penalties can push a small raw score below zero
        let engine = FusionEngine::new(
            FusionWeights::default(),
            BiasConfig {
                lexical_only_penalty: 50.0,
                ..BiasConfig::default()
            },
            SeverityThresholds::default(),
        );
        let fused = engine.fuse(signals(75.0, 0.0, 0.0));
        assert_eq!(fused.final_score, 0.0);
    }

    #[test]
    fn test_severity_boundaries_inclusive() {
        let engine = FusionEngine::default();
        assert_eq!(engine.classify(90.0), Severity::Severe);
        assert_eq!(engine.classify(89.999), Severity::Partial);
        assert_eq!(engine.classify(60.0), Severity::Partial);
        assert_eq!(engine.classify(59.999), Severity::Clean);
        assert_eq!(engine.classify(0.0), Severity::Clean);
        assert_eq!(engine.classify(100.0), Severity::Severe);
    }

    #[test]
    fn test_uncertainty_rule_spread_boundary() {
        // {55, 50, 45} has population std dev ~4.08: below the 5.0 threshold
        let fused = FusionEngine::default().fuse(signals(55.0, 50.0, 45.0));
        assert!(fused.adjustments.is_empty());

        // {60, 50, 40} has std dev ~8.16: fires
        let fused = FusionEngine::default().fuse(signals(60.0, 50.0, 40.0));
        assert_eq!(fused.adjustments[0].rule, BiasRule::UncertaintyPenalty);
    }
}
