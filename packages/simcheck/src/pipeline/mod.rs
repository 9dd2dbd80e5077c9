//! Pair engine and batch pipeline
//!
//! Wires the normalizer, structural engine, fusion engine, and the two
//! collaborator signals into a per-pair computation, then fans an all-pairs
//! batch out over rayon. Each pair is a pure function of its two inputs and
//! the active configuration; pair-local failures degrade to fallback scores
//! and a batch over N submissions always yields exactly N*(N-1)/2 rows.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{SemanticFallback, SimilarityConfig};
use crate::errors::Result;
use crate::fusion::FusionEngine;
use crate::normalize::{default_strategy, normalizer_for, NormalizedCache};
use crate::parsing::{Language, ParserPool};
use crate::shared::models::{
    pairwise_comparison_count, PairResult, Severity, SignalScores, SimilarityResult, Submission,
    SubmissionSummary,
};
use crate::shared::sequence::lcs_length;
use crate::structural::{gst::tokenize, StructuralAnalyzer};

/// Lexical collaborator: compares normalized code, returns a score in
/// [0, 100], and must return 0 instead of propagating internal failures.
pub trait LexicalAnalyzer: Send + Sync {
    fn compute_similarity(&self, code1: &str, code2: &str) -> f64;
}

/// Semantic collaborator. May fail; the engine maps failures to the
/// configured fallback.
pub trait SemanticAnalyzer: Send + Sync {
    fn compute_similarity(&self, code1: &str, code2: &str) -> Result<f64>;
}

/// Default lexical signal: token-sequence ratio over the normalized code,
/// `2 * LCS / (n1 + n2)`. A screening measure, not a TF-IDF replacement.
#[derive(Debug, Default)]
pub struct TokenRatioLexical;

impl LexicalAnalyzer for TokenRatioLexical {
    fn compute_similarity(&self, code1: &str, code2: &str) -> f64 {
        let tokens1 = tokenize(code1);
        let tokens2 = tokenize(code2);
        if tokens1.is_empty() || tokens2.is_empty() {
            return 0.0;
        }
        let lcs = lcs_length(&tokens1, &tokens2);
        2.0 * lcs as f64 / (tokens1.len() + tokens2.len()) as f64 * 100.0
    }
}

/// Token-level diagnostics for one code string
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TokenStatistics {
    pub total_tokens: usize,
    pub unique_tokens: usize,
    pub vocabulary_richness: f64,
}

/// Total/unique token counts and vocabulary richness
pub fn token_statistics(code: &str) -> TokenStatistics {
    let tokens = tokenize(code);
    let unique: ahash::AHashSet<&String> = tokens.iter().collect();
    TokenStatistics {
        total_tokens: tokens.len(),
        unique_tokens: unique.len(),
        vocabulary_richness: if tokens.is_empty() {
            0.0
        } else {
            unique.len() as f64 / tokens.len() as f64
        },
    }
}

/// Per-pair similarity engine. Construct once per batch; safe to share
/// across worker threads.
pub struct PairEngine {
    config: SimilarityConfig,
    structural: StructuralAnalyzer,
    fusion: FusionEngine,
    lexical: Box<dyn LexicalAnalyzer>,
    semantic: Option<Box<dyn SemanticAnalyzer>>,
    cache: NormalizedCache,
    pool: Arc<ParserPool>,
}

impl PairEngine {
    /// Build an engine from a configuration. Validation is fatal here, never
    /// inside a pair.
    pub fn new(config: SimilarityConfig) -> Result<Self> {
        config.validate()?;
        let pool = ParserPool::shared();
        Ok(Self {
            structural: StructuralAnalyzer::new(&config, Arc::clone(&pool)),
            fusion: FusionEngine::new(config.fusion, config.bias, config.severity),
            lexical: Box::new(TokenRatioLexical),
            semantic: None,
            cache: NormalizedCache::new(),
            pool,
            config,
        })
    }

    pub fn with_lexical(mut self, lexical: Box<dyn LexicalAnalyzer>) -> Self {
        self.lexical = lexical;
        self
    }

    pub fn with_semantic(mut self, semantic: Box<dyn SemanticAnalyzer>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    /// Compare one ordered pair. Never fails; every degradation path ends in
    /// a score.
    ///
    /// Normalization happens once per submission (cached) and all three
    /// signals read the normalized code, so renamed copies converge before
    /// any analyzer sees them.
    pub fn compare_pair(&self, sub1: &Submission, sub2: &Submission) -> SimilarityResult {
        // Language uniformity within a batch is the caller's contract
        let language = sub1.language;
        let norm1 = self.normalized(sub1, language);
        let norm2 = self.normalized(sub2, language);

        let lexical = self
            .lexical
            .compute_similarity(&norm1, &norm2)
            .clamp(0.0, 100.0);
        let structural = self.structural.compute(&norm1, &norm2, language);
        let semantic = self.semantic_score(&norm1, &norm2, lexical);

        let signals = SignalScores {
            lexical,
            structural: structural.score,
            semantic,
        };
        let fused = self.fusion.fuse(signals);

        SimilarityResult {
            final_score: fused.final_score,
            raw_score: fused.raw_score,
            breakdown: signals,
            structural_method: structural.method,
            structural_breakdown: structural.breakdown,
            severity: fused.severity,
            adjustments: fused.adjustments,
        }
    }

    /// All-pairs batch: N*(N-1)/2 rows, computed in parallel, sorted by
    /// final score descending.
    pub fn analyze_batch(&self, submissions: &[Submission]) -> Vec<PairResult> {
        let n = submissions.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();
        info!(submissions = n, pairs = pairs.len(), "starting batch comparison");

        let mut results: Vec<PairResult> = pairs
            .par_iter()
            .map(|&(i, j)| {
                let sub1 = &submissions[i];
                let sub2 = &submissions[j];
                PairResult {
                    id1: sub1.id.clone(),
                    id2: sub2.id.clone(),
                    result: self.compare_pair(sub1, sub2),
                }
            })
            .collect();

        results.sort_by(|a, b| b.result.final_score.total_cmp(&a.result.final_score));
        debug_assert_eq!(results.len(), pairwise_comparison_count(n));
        results
    }

    /// `analyze_batch` on a dedicated worker pool. Falls back to the global
    /// pool if the dedicated one cannot be built.
    pub fn analyze_batch_with_workers(
        &self,
        submissions: &[Submission],
        workers: usize,
    ) -> Vec<PairResult> {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()
        {
            Ok(pool) => pool.install(|| self.analyze_batch(submissions)),
            Err(e) => {
                warn!(error = %e, "dedicated worker pool unavailable, using global pool");
                self.analyze_batch(submissions)
            }
        }
    }

    /// Per-submission rollup of a batch: highest-scoring counterpart per id
    pub fn summarize_submissions(
        &self,
        submissions: &[Submission],
        results: &[PairResult],
    ) -> Vec<SubmissionSummary> {
        submissions
            .iter()
            .map(|sub| {
                let best = results
                    .iter()
                    .filter_map(|row| {
                        if row.id1 == sub.id {
                            Some((row.result.final_score, row.id2.clone()))
                        } else if row.id2 == sub.id {
                            Some((row.result.final_score, row.id1.clone()))
                        } else {
                            None
                        }
                    })
                    .max_by(|a, b| a.0.total_cmp(&b.0));
                match best {
                    Some((score, other)) => SubmissionSummary {
                        id: sub.id.clone(),
                        similarity_score: score,
                        most_similar_to: Some(other),
                        severity: self.fusion.classify(score),
                    },
                    None => SubmissionSummary {
                        id: sub.id.clone(),
                        similarity_score: 0.0,
                        most_similar_to: None,
                        severity: Severity::Clean,
                    },
                }
            })
            .collect()
    }

    fn normalized(&self, sub: &Submission, language: Language) -> Arc<String> {
        let strategy = self
            .config
            .normalization
            .unwrap_or_else(|| default_strategy(language));
        self.cache.get_or_compute(&sub.id, strategy, || {
            normalizer_for(language, Some(strategy), Arc::clone(&self.pool)).normalize(&sub.code)
        })
    }

    fn semantic_score(&self, code1: &str, code2: &str, lexical: f64) -> f64 {
        let max = self.config.semantic.max_input_chars;
        let score = match &self.semantic {
            Some(analyzer) => {
                match analyzer.compute_similarity(truncate_chars(code1, max), truncate_chars(code2, max))
                {
                    Ok(score) => Some(score),
                    Err(e) => {
                        warn!(error = %e, "semantic collaborator failed, using fallback");
                        None
                    }
                }
            }
            None => None,
        };
        let score = score.unwrap_or(match self.config.semantic.fallback {
            SemanticFallback::Zero => 0.0,
            SemanticFallback::Lexical => lexical,
            SemanticFallback::Pinned(value) => value,
        });
        score.clamp(0.0, 100.0)
    }
}

/// One worker per available core
pub fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}

/// Truncate to at most `max` characters on a char boundary
fn truncate_chars(code: &str, max: usize) -> &str {
    match code.char_indices().nth(max) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}
