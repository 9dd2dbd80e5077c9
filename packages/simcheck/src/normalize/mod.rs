//! Code normalization
//!
//! Strips the surface variation that renaming-style plagiarism introduces
//! before the lexical signal is computed. Three strategies share one
//! contract: the universal token stream, a syntax-tree rewriter for Python,
//! and a regex heuristic for the curly-brace languages. All of them are
//! deterministic within a run, never raise, and degrade to the original
//! code (or best-effort tokens) on unparseable input.

pub mod regex;
pub mod token;
pub mod tree;

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::parsing::{Language, ParserPool};

pub use self::regex::RegexNormalizer;
pub use self::token::TokenNormalizer;
pub use self::tree::TreeNormalizer;

/// Normalization strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationStrategy {
    /// Language-agnostic token stream (`TYPE` / `NUM` / `VARk` labels)
    Token,
    /// Syntax-tree identifier rewriting; output stays valid code
    Tree,
    /// Keyword-preserving regex rewriting; output stays code-shaped
    Regex,
}

/// Common normalizer contract.
///
/// `normalize` runs the full pipeline; the remaining stages are exposed
/// individually for diagnostics. Identifier slot state is local to each
/// `normalize` call, so one instance is safe to share across pairs.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, code: &str) -> String;
    fn remove_comments(&self, code: &str) -> String;
    fn normalize_identifiers(&self, code: &str) -> String;
    fn canonicalize_structures(&self, code: &str) -> String;

    fn strategy(&self) -> NormalizationStrategy;
}

/// Default strategy for a language when the configuration does not override
pub fn default_strategy(language: Language) -> NormalizationStrategy {
    match language {
        Language::Python => NormalizationStrategy::Tree,
        Language::Java | Language::Cpp | Language::C => NormalizationStrategy::Regex,
    }
}

/// Build the normalizer for `language`, honoring an optional strategy
/// override from configuration.
pub fn normalizer_for(
    language: Language,
    strategy: Option<NormalizationStrategy>,
    pool: Arc<ParserPool>,
) -> Box<dyn Normalizer> {
    match strategy.unwrap_or_else(|| default_strategy(language)) {
        NormalizationStrategy::Token => Box::new(TokenNormalizer::new()),
        NormalizationStrategy::Tree => Box::new(TreeNormalizer::new(language, pool)),
        NormalizationStrategy::Regex => Box::new(RegexNormalizer::new(language)),
    }
}

/// Collapse runs of spaces/tabs, strip trailing whitespace, and squeeze
/// repeated blank lines. Shared by the code-shaped strategies.
pub(crate) fn normalize_whitespace(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut blank_run = 0usize;
    for line in code.lines() {
        let mut collapsed = String::with_capacity(line.len());
        let mut in_gap = false;
        for ch in line.chars() {
            if ch == ' ' || ch == '\t' {
                in_gap = true;
            } else {
                if in_gap && !collapsed.is_empty() {
                    collapsed.push(' ');
                }
                // Leading indentation collapses to nothing for non-Python
                // callers and is re-added by the tree strategy where it
                // matters, so keep one space of indent if the line had any.
                if in_gap && collapsed.is_empty() {
                    collapsed.push(' ');
                }
                in_gap = false;
                collapsed.push(ch);
            }
        }
        let trimmed = collapsed.trim_end();
        if trimmed.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push('\n');
        } else {
            blank_run = 0;
            out.push_str(trimmed);
            out.push('\n');
        }
    }
    out.trim().to_string()
}

/// Cache of normalized code keyed by submission id and strategy.
///
/// Submissions are immutable within a batch, so an id + strategy pair
/// identifies one normalization output.
pub struct NormalizedCache {
    entries: DashMap<(String, NormalizationStrategy), Arc<String>, ahash::RandomState>,
}

impl NormalizedCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Fetch the cached normalization for `(id, strategy)`, computing and
    /// storing it on first use.
    pub fn get_or_compute<F>(
        &self,
        id: &str,
        strategy: NormalizationStrategy,
        compute: F,
    ) -> Arc<String>
    where
        F: FnOnce() -> String,
    {
        if let Some(hit) = self.entries.get(&(id.to_string(), strategy)) {
            return Arc::clone(hit.value());
        }
        let value = Arc::new(compute());
        self.entries
            .entry((id.to_string(), strategy))
            .or_insert_with(|| Arc::clone(&value));
        Arc::clone(&value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NormalizedCache {
    fn default() -> Self {
        Self::new()
    }
}
