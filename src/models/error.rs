//! Error types for namer.
//!
//! Taxonomy:
//! - Expected failures: bad config, malformed snapshots, unusable responses
//! - Infrastructure failures: network, filesystem
//! - Invariant violations: driver ordering bugs

use thiserror::Error;

/// Top-level error type for namer.
#[derive(Debug, Error)]
pub enum NamerError {
    // ═══════════════════════════════════════════════════════════════════
    // Expected failures
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Parse error: {0}")]
    ParseError(String),

    // ═══════════════════════════════════════════════════════════════════
    // Infrastructure failures
    // ═══════════════════════════════════════════════════════════════════

    #[error("Scoring failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Invariant violations
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors from scoring a single name fragment.
///
/// Every variant aborts the scoring pass; none are retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Scoring service returned status {status}")]
    Status { status: u16, body: String },

    #[error("Cannot find score for '{fragment}' in response: {body}")]
    UnparsableResponse { fragment: String, body: String },

    #[error("No single-character score for '{0}' before scoring its pairs")]
    MissingParent(char),
}

impl NamerError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl FetchError {
    /// Raw response body, when the failure carries one.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } | Self::UnparsableResponse { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Result type alias for namer.
pub type Result<T> = std::result::Result<T, NamerError>;
