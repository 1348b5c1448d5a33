//! # Error Types
//!
//! Errors raised while parsing shared identifiers.

use thiserror::Error;

/// Failure to parse an identifier from its text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Input was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded byte length did not match.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
