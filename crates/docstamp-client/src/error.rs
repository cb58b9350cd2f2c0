//! Error types for the registration client.

use thiserror::Error;

/// Errors surfaced to client callers.
///
/// A digest that is already registered is not an error: it is reported as
/// [`StoreOutcome::AlreadyRegistered`](crate::StoreOutcome::AlreadyRegistered).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The digest is not exactly the expected length. Nothing was sent.
    #[error("malformed digest: expected {expected} bytes, got {actual}")]
    MalformedDigest { expected: usize, actual: usize },

    /// The registration could not be submitted, or its confirmation was lost.
    #[error("submission failed: {reason}")]
    SubmissionFailed { reason: String },

    /// The ledger could not be queried. Says nothing about whether the
    /// digest is registered.
    #[error("query unavailable: {reason}")]
    QueryUnavailable { reason: String },
}

impl ClientError {
    /// Whether trying the same call again might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::MalformedDigest { .. } => false,
            ClientError::SubmissionFailed { .. } | ClientError::QueryUnavailable { .. } => true,
        }
    }
}

/// Errors at the transport seam.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The ledger could not be reached right now.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The transport has shut down.
    #[error("transport closed")]
    Closed,

    /// The ledger was reached but failed to process the request.
    #[error("ledger error: {0}")]
    Ledger(String),
}

impl TransportError {
    /// Whether the client should retry a submission that failed this way.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Unavailable(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
