/*
 * Simcheck - Code Similarity Screening Core
 *
 * Feature-First Architecture:
 * - shared/     : Common models (Submission, SimilarityResult, metrics)
 * - parsing/    : Language selection + shared tree-sitter parser pool
 * - normalize/  : Token / tree / regex normalization strategies
 * - structural/ : Feature syntax-tree, RK-GST, node-type analyzers
 * - fusion/     : Signal fusion, bias rules, severity classification
 * - pipeline/   : Collaborator traits, pair engine, rayon batch runs
 *
 * Scoring model:
 * - Three signals per pair (lexical, structural, semantic), each 0-100
 * - Weighted fusion with ordered bias corrections and an adjustment log
 * - Per-pair failures degrade to fallback scores; only config errors are fatal
 */

#![allow(clippy::needless_range_loop)] // Range loop for marked-index access
#![allow(clippy::new_without_default)] // Default impl not always needed

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and metric utilities
pub mod shared;

/// Language selection and tree-sitter parsing
pub mod parsing;

/// Normalization strategies
pub mod normalize;

/// Structural similarity engine
pub mod structural;

/// Fusion and bias engine
pub mod fusion;

/// Pair engine and batch pipeline
pub mod pipeline;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{SimilarityConfig, StructuralMethod};
pub use errors::{Result, SimcheckError};
pub use parsing::{Language, ParserPool};
pub use pipeline::{LexicalAnalyzer, PairEngine, SemanticAnalyzer};
pub use shared::models::{
    PairResult, Severity, SignalScores, SimilarityResult, Submission, SubmissionSummary,
};
