use thiserror::Error;

/// Errors raised by the dot/causal-context substrate and the CRDTs built on it.
///
/// The crate's own code paths never construct a malformed dot, so a caller only
/// sees these when feeding the library external, unvalidated input.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CrdtError {
    #[error("invalid dot: {reason}")]
    InvalidDot { reason: String },

    #[error("invalid dot format: {input:?} does not match \"id:counter\"")]
    InvalidDotFormat { input: String },

    #[error("cannot join values of unjoinable types")]
    UnjoinableTypes,
}

pub type Result<T> = std::result::Result<T, CrdtError>;
