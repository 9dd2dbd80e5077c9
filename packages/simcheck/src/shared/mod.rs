//! Shared models and metric utilities

pub mod models;
pub mod sequence;

pub use models::{
    Adjustment, BiasRule, CodeFingerprint, PairResult, Severity, SignalScores, SimilarityResult,
    StructuralBreakdown, StructuralScore, Submission,
};
pub use sequence::{
    jaccard_similarity, lcs_length, normalized_lcs, population_std_dev, sequence_similarity,
};
