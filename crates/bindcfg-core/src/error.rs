//! # Error Types
//!
//! Errors raised by the foundational types. Higher layers (parser, store,
//! resolvers) wrap these in their own `thiserror` enums.

use thiserror::Error;

/// A rule target or symbol name that cannot be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// Nothing left after trimming.
    #[error("empty qualified name")]
    Empty,

    /// `<` and `>` do not pair up outside operator names.
    #[error("unbalanced template brackets in {0:?}")]
    UnbalancedTemplate(String),

    /// A `::` with nothing on one side.
    #[error("empty scope segment in {0:?}")]
    EmptySegment(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Text that is not a SHA-256 digest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid sha256 digest {0:?}: expected 64 hex digits")]
pub struct DigestParseError(pub String);
