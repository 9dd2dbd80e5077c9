//! Core domain models
//!
//! Submissions, per-pair similarity results, severity levels, and the bias
//! adjustment log carried on every result.

use serde::{Deserialize, Serialize};

use crate::parsing::Language;

/// A single code submission. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Submission identifier (unique within a batch)
    pub id: String,

    /// Raw source code
    pub code: String,

    /// Programming language (assumed uniform within one batch)
    pub language: Language,

    /// Optional opaque metadata carried through to results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Submission {
    pub fn new(id: impl Into<String>, code: impl Into<String>, language: Language) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            language,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Quick content fingerprint for cache keys and diagnostics
    pub fn fingerprint(&self) -> CodeFingerprint {
        CodeFingerprint::of(&self.code)
    }
}

/// Severity classification of a fused similarity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Below the partial threshold
    Clean,
    /// At or above the partial threshold, below severe
    Partial,
    /// At or above the severe threshold
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Clean => "clean",
            Severity::Partial => "partial",
            Severity::Severe => "severe",
        }
    }
}

/// The three raw input signals, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub lexical: f64,
    pub structural: f64,
    pub semantic: f64,
}

/// Per-sub-method scores produced by the hybrid structural combinator
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuralBreakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_ast: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gst: Option<f64>,
}

/// Result of one structural similarity computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralScore {
    /// Score in [0, 100]
    pub score: f64,
    /// Name of the method that produced the score
    pub method: String,
    /// Sub-method breakdown (hybrid only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<StructuralBreakdown>,
}

/// Bias rules, in the fixed order they are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasRule {
    /// High lexical similarity without structural/semantic support
    LexicalOnlyPenalty,
    /// Structural and semantic signals both above the agreement threshold
    AgreementBoost,
    /// High variance across the three signals
    UncertaintyPenalty,
}

/// One entry of the ordered adjustment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub rule: BiasRule,
    /// Signed score delta applied by the rule
    pub delta: f64,
}

impl std::fmt::Display for Adjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.rule {
            BiasRule::LexicalOnlyPenalty => {
                write!(
                    f,
                    "reduced by {:.1} points (lexical-only similarity)",
                    -self.delta
                )
            }
            BiasRule::AgreementBoost => {
                write!(
                    f,
                    "boosted by {:.1} points (multi-signal agreement)",
                    self.delta
                )
            }
            BiasRule::UncertaintyPenalty => {
                write!(
                    f,
                    "reduced by {:.1} points (signal uncertainty)",
                    -self.delta
                )
            }
        }
    }
}

/// Full similarity verdict for one ordered pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Fused, bias-adjusted score in [0, 100]
    pub final_score: f64,
    /// Weighted sum before bias adjustments
    pub raw_score: f64,
    /// The three raw signals
    pub breakdown: SignalScores,
    /// Structural method name and optional sub-breakdown
    pub structural_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural_breakdown: Option<StructuralBreakdown>,
    /// Severity classification of `final_score`
    pub severity: Severity,
    /// Every bias rule that fired, in evaluation order
    pub adjustments: Vec<Adjustment>,
}

/// One row of a batch run: a pair of submission ids plus its verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairResult {
    pub id1: String,
    pub id2: String,
    #[serde(flatten)]
    pub result: SimilarityResult,
}

/// Per-submission summary derived from the pair rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionSummary {
    pub id: String,
    /// Highest final score over all pairs containing this submission
    pub similarity_score: f64,
    /// Counterpart id of that highest-scoring pair, if any pair exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_similar_to: Option<String>,
    pub severity: Severity,
}

/// Content fingerprint: hash + size metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFingerprint {
    pub hash: u64,
    pub length: usize,
    pub line_count: usize,
}

impl CodeFingerprint {
    pub fn of(code: &str) -> Self {
        Self {
            hash: fnv1a_hash(code.as_bytes()),
            length: code.len(),
            line_count: code.lines().count().max(1),
        }
    }
}

/// FNV-1a over a byte slice
pub fn fnv1a_hash(bytes: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Number of unordered pairs over `n` submissions: n choose 2
pub fn pairwise_comparison_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}
