//! Error types for simcheck
//!
//! Provides unified error handling across the crate.
//!
//! Propagation policy: pair-local failures (unparseable code, missing
//! collaborator) degrade to fallback scores inside the pair computation and
//! never surface as an `Err`; only configuration-time problems are fatal.

use thiserror::Error;

/// Main error type for simcheck operations
#[derive(Debug, Error)]
pub enum SimcheckError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Normalization error
    #[error("Normalization error: {0}")]
    Normalization(String),

    /// Analysis error
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Configuration error (fatal, load time only)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SimcheckError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        SimcheckError::Parse(msg.into())
    }

    /// Create an analysis error
    pub fn analysis(msg: impl Into<String>) -> Self {
        SimcheckError::Analysis(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        SimcheckError::Config(msg.into())
    }
}

/// Result type alias for simcheck operations
pub type Result<T> = std::result::Result<T, SimcheckError>;
