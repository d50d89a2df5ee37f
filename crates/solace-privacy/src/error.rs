//! Error types for sanitization.

use thiserror::Error;

/// Sanitization error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    /// Strict mode found an identifier that must never be rewritten
    /// and sent onward.
    #[error("PHI detected: {category}")]
    PhiDetected { category: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Result type for sanitization operations
pub type PrivacyResult<T> = Result<T, PrivacyError>;
