//! Error types for the ledger.

use docstamp_core::{DigestKey, LogError, RegistrationRecord};
use docstamp_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The stored log could not be replayed.
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),

    /// The live index disagrees with the log.
    #[error("index diverges from log at digest {digest}")]
    IndexDivergence { digest: DigestKey },
}

/// A log that cannot be replayed into an index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// The log violates sequence, chain, time, or write-once rules.
    #[error(transparent)]
    InvalidLog(#[from] LogError),
}

/// The digest already has a registration.
///
/// This is a conflict signal rather than a failure: the ledger is intact
/// and `existing` is the record that was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("digest already registered at {}", .existing.registered_at)]
pub struct AlreadyRegistered {
    /// The record created by the first registration.
    pub existing: RegistrationRecord,
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
