//! Error types for Docstamp Core.

use thiserror::Error;

use crate::types::DigestKey;

/// Core errors that can occur while building or decoding primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed digest: expected {expected} bytes, got {actual}")]
    MalformedDigest { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Violations found while checking a log against its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("sequence gap: expected entry {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },

    #[error("broken hash chain at entry {seq}")]
    BrokenChain { seq: u64 },

    #[error("ledger time went backwards at entry {seq}: {previous} > {current}")]
    TimeRegression { seq: u64, previous: i64, current: i64 },

    #[error("digest {digest} registered twice (entries {first} and {second})")]
    DuplicateDigest {
        digest: DigestKey,
        first: u64,
        second: u64,
    },
}
