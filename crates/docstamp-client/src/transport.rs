//! Transport abstraction between the client and the ledger.
//!
//! A submission is acknowledged as soon as the ledger accepts it for
//! processing. The ledger's answer arrives later through the returned
//! [`Confirmation`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use docstamp_core::{DigestKey, Identity, Keypair};
use docstamp_ledger::{QueryResult, RegisterOutcome};

use crate::error::TransportError;

/// Identifies one submission for as long as it is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A request to register a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRequest {
    pub digest: DigestKey,
    pub registrant: Identity,
}

/// The ledger's eventual answer to a submission.
pub type ConfirmationResult = std::result::Result<RegisterOutcome, TransportError>;

/// Sending half of a [`Confirmation`], held by the transport.
pub type ConfirmationSender = oneshot::Sender<ConfirmationResult>;

/// Receipt for an accepted submission.
#[derive(Debug)]
pub struct Confirmation {
    pub(crate) id: SubmissionId,
    pub(crate) rx: oneshot::Receiver<ConfirmationResult>,
}

impl Confirmation {
    /// Create a confirmation and the sender that will resolve it.
    pub fn channel(id: SubmissionId) -> (ConfirmationSender, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { id, rx })
    }

    /// The submission this confirms.
    pub fn id(&self) -> SubmissionId {
        self.id
    }
}

/// Transport trait for reaching the ledger.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Submit a registration.
    ///
    /// `Ok` means the ledger accepted the request for processing, not that
    /// it has been applied.
    async fn submit(&self, request: RegisterRequest)
        -> std::result::Result<Confirmation, TransportError>;

    /// Read the ledger's current record for `digest`.
    async fn query(&self, digest: &DigestKey) -> std::result::Result<QueryResult, TransportError>;
}

#[async_trait]
impl<T: LedgerTransport + ?Sized> LedgerTransport for Arc<T> {
    async fn submit(
        &self,
        request: RegisterRequest,
    ) -> std::result::Result<Confirmation, TransportError> {
        (**self).submit(request).await
    }

    async fn query(&self, digest: &DigestKey) -> std::result::Result<QueryResult, TransportError> {
        (**self).query(digest).await
    }
}

/// Supplies the identity recorded as registrant.
pub trait IdentityProvider: Send + Sync {
    fn identity(&self) -> Identity;
}

impl IdentityProvider for Keypair {
    fn identity(&self) -> Identity {
        Keypair::identity(self)
    }
}

impl IdentityProvider for Identity {
    fn identity(&self) -> Identity {
        *self
    }
}

impl<P: IdentityProvider + ?Sized> IdentityProvider for Arc<P> {
    fn identity(&self) -> Identity {
        (**self).identity()
    }
}
