//! The registration client: store and verify document digests.
//!
//! Storing is two-phase. [`RegistrationClient::store`] returns once the
//! ledger has accepted the submission (*Submitted*); the
//! [`PendingRegistration`] it returns resolves when the ledger has applied
//! it (*Confirmed*). Giving up on the wait never retracts the submission.

use std::time::Duration;

use tokio::sync::{oneshot, watch};

use docstamp_core::{DigestKey, Identity, LogicalTime, RegistrationRecord, DIGEST_LEN};
use docstamp_ledger::{QueryResult, RegisterOutcome};

use crate::error::{ClientError, Result};
use crate::transport::{
    Confirmation, ConfirmationResult, IdentityProvider, LedgerTransport, RegisterRequest,
    SubmissionId,
};

/// Configuration for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Times a submission is attempted before giving up (at least once).
    pub submit_attempts: u32,
    /// Pause between submission attempts.
    pub retry_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            submit_attempts: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// Confirmed result of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// This store created the record.
    Registered(RegistrationRecord),
    /// The digest was already registered; this is the existing record.
    AlreadyRegistered(RegistrationRecord),
}

impl StoreOutcome {
    /// The record now held by the ledger for the digest.
    pub fn record(&self) -> &RegistrationRecord {
        match self {
            StoreOutcome::Registered(record) | StoreOutcome::AlreadyRegistered(record) => record,
        }
    }

    /// Whether this store created the record.
    pub fn is_new(&self) -> bool {
        matches!(self, StoreOutcome::Registered(_))
    }

    /// What a verify of the same digest now reports.
    pub fn verification(&self) -> Verification {
        Verification::from(self.record())
    }
}

impl From<RegisterOutcome> for StoreOutcome {
    fn from(outcome: RegisterOutcome) -> Self {
        match outcome {
            RegisterOutcome::Registered(record) => StoreOutcome::Registered(record),
            RegisterOutcome::AlreadyRegistered(record) => StoreOutcome::AlreadyRegistered(record),
        }
    }
}

/// Result of verifying a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The ledger has no record for the digest.
    NotFound,
    /// The digest is registered.
    Verified {
        registered_at: LogicalTime,
        ledger_time_ms: i64,
        registrant: Identity,
    },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified { .. })
    }
}

impl From<&RegistrationRecord> for Verification {
    fn from(record: &RegistrationRecord) -> Self {
        Verification::Verified {
            registered_at: record.registered_at,
            ledger_time_ms: record.ledger_time_ms,
            registrant: record.registrant,
        }
    }
}

impl From<QueryResult> for Verification {
    fn from(result: QueryResult) -> Self {
        match result.record {
            Some(record) => Verification::from(&record),
            None => Verification::NotFound,
        }
    }
}

/// Progress of a store, as published by [`RegistrationClient::store_and_watch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationPhase {
    /// Accepted by the ledger, not yet applied.
    Submitted { id: SubmissionId },
    /// Applied (or definitively failed).
    Confirmed(Result<StoreOutcome>),
}

/// A submitted registration awaiting confirmation.
#[derive(Debug)]
pub struct PendingRegistration {
    id: SubmissionId,
    digest: DigestKey,
    rx: oneshot::Receiver<ConfirmationResult>,
    resolved: Option<Result<StoreOutcome>>,
}

impl PendingRegistration {
    fn new(digest: DigestKey, confirmation: Confirmation) -> Self {
        Self {
            id: confirmation.id,
            digest,
            rx: confirmation.rx,
            resolved: None,
        }
    }

    /// The submission being waited on.
    pub fn id(&self) -> SubmissionId {
        self.id
    }

    /// The digest submitted.
    pub fn digest(&self) -> &DigestKey {
        &self.digest
    }

    /// Wait for the ledger's answer.
    pub async fn confirmed(mut self) -> Result<StoreOutcome> {
        if let Some(resolved) = self.resolved.take() {
            return resolved;
        }
        let received = (&mut self.rx).await;
        settle(self.id, received)
    }

    /// Wait for the ledger's answer for at most `timeout`.
    ///
    /// `Ok(None)` means the answer has not arrived yet. The handle can be
    /// waited on again and the submission stays in flight.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<StoreOutcome>> {
        if let Some(resolved) = &self.resolved {
            return resolved.clone().map(Some);
        }

        match tokio::time::timeout(timeout, &mut self.rx).await {
            Err(_) => Ok(None),
            Ok(received) => {
                let settled = settle(self.id, received);
                self.resolved = Some(settled.clone());
                settled.map(Some)
            }
        }
    }
}

fn settle(
    id: SubmissionId,
    received: std::result::Result<ConfirmationResult, oneshot::error::RecvError>,
) -> Result<StoreOutcome> {
    match received {
        Ok(Ok(outcome)) => Ok(outcome.into()),
        Ok(Err(e)) => Err(ClientError::SubmissionFailed {
            reason: e.to_string(),
        }),
        Err(_) => {
            tracing::warn!(id = %id, "confirmation dropped");
            Err(ClientError::SubmissionFailed {
                reason: format!("confirmation for {} was dropped", id),
            })
        }
    }
}

/// Client for storing and verifying document digests.
pub struct RegistrationClient<T: LedgerTransport, I: IdentityProvider> {
    transport: T,
    identity: I,
    config: ClientConfig,
}

impl<T: LedgerTransport, I: IdentityProvider> RegistrationClient<T, I> {
    /// Create a new client.
    pub fn new(transport: T, identity: I, config: ClientConfig) -> Self {
        Self {
            transport,
            identity,
            config,
        }
    }

    /// The identity this client registers as.
    pub fn identity(&self) -> Identity {
        self.identity.identity()
    }

    /// Get the transport reference.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Store
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit a registration for a raw digest.
    ///
    /// Fails with `MalformedDigest`, before touching the transport, unless
    /// `digest` is exactly 32 bytes.
    pub async fn store(&self, digest: &[u8]) -> Result<PendingRegistration> {
        let digest = parse_digest(digest)?;
        self.store_digest(digest).await
    }

    /// Submit a registration for a digest.
    ///
    /// Transient transport failures are retried; re-submitting is safe
    /// because the ledger registers each digest at most once.
    pub async fn store_digest(&self, digest: DigestKey) -> Result<PendingRegistration> {
        let request = RegisterRequest {
            digest,
            registrant: self.identity.identity(),
        };
        let attempts = self.config.submit_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.transport.submit(request).await {
                Ok(confirmation) => {
                    tracing::debug!(id = %confirmation.id(), digest = %digest, "submitted");
                    return Ok(PendingRegistration::new(digest, confirmation));
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    tracing::warn!(attempt, error = %e, digest = %digest, "submission failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(e) => {
                    return Err(ClientError::SubmissionFailed {
                        reason: e.to_string(),
                    })
                }
            }
        }
    }

    /// Submit a registration and follow it through a watch channel.
    ///
    /// The receiver starts at `Submitted` and moves to `Confirmed` once.
    pub async fn store_and_watch(
        &self,
        digest: &[u8],
    ) -> Result<watch::Receiver<RegistrationPhase>> {
        let pending = self.store(digest).await?;
        let (tx, rx) = watch::channel(RegistrationPhase::Submitted { id: pending.id() });

        tokio::spawn(async move {
            let confirmed = pending.confirmed().await;
            let _ = tx.send(RegistrationPhase::Confirmed(confirmed));
        });

        Ok(rx)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verify
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up a raw digest.
    pub async fn verify(&self, digest: &[u8]) -> Result<Verification> {
        let digest = parse_digest(digest)?;
        self.verify_digest(&digest).await
    }

    /// Look up a digest.
    ///
    /// A transport failure is `QueryUnavailable`, never `NotFound`.
    pub async fn verify_digest(&self, digest: &DigestKey) -> Result<Verification> {
        let result = self.transport.query(digest).await.map_err(|e| {
            tracing::warn!(error = %e, digest = %digest, "query failed");
            ClientError::QueryUnavailable {
                reason: e.to_string(),
            }
        })?;

        Ok(Verification::from(result))
    }
}

fn parse_digest(bytes: &[u8]) -> Result<DigestKey> {
    DigestKey::from_slice(bytes).map_err(|_| ClientError::MalformedDigest {
        expected: DIGEST_LEN,
        actual: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use docstamp_core::Keypair;
    use docstamp_ledger::{Ledger, LedgerConfig};
    use docstamp_store::MemoryStore;

    use crate::local::{LocalTransport, LocalTransportConfig};

    fn client(
        delay: Duration,
    ) -> RegistrationClient<LocalTransport<MemoryStore>, Keypair> {
        let ledger = Arc::new(Ledger::new(MemoryStore::new(), LedgerConfig::default()));
        let transport = LocalTransport::spawn(
            ledger,
            LocalTransportConfig {
                confirmation_delay: delay,
                ..LocalTransportConfig::default()
            },
        );
        RegistrationClient::new(transport, Keypair::from_seed(&[1u8; 32]), ClientConfig::default())
    }

    #[tokio::test]
    async fn test_store_then_verify() {
        let client = client(Duration::ZERO);
        let digest = [0xaa; 32];

        let outcome = client.store(&digest).await.unwrap().confirmed().await.unwrap();
        assert!(outcome.is_new());
        assert_eq!(outcome.record().registrant, client.identity());

        let verification = client.verify(&digest).await.unwrap();
        assert_eq!(verification, outcome.verification());
    }

    #[tokio::test]
    async fn test_verify_unknown_is_not_found() {
        let client = client(Duration::ZERO);
        assert_eq!(client.verify(&[0x42; 32]).await.unwrap(), Verification::NotFound);
    }

    #[tokio::test]
    async fn test_malformed_digest_rejected() {
        let client = client(Duration::ZERO);

        let err = client.store(&[1, 2, 3]).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::MalformedDigest {
                expected: 32,
                actual: 3
            }
        );
        assert!(matches!(
            client.verify(&[0u8; 33]).await,
            Err(ClientError::MalformedDigest { actual: 33, .. })
        ));

        // Nothing reached the ledger.
        assert!(client.transport().ledger().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_second_store_reports_existing() {
        let client = client(Duration::ZERO);
        let digest = [0xbb; 32];

        let first = client.store(&digest).await.unwrap().confirmed().await.unwrap();
        let second = client.store(&digest).await.unwrap().confirmed().await.unwrap();

        assert_eq!(second, StoreOutcome::AlreadyRegistered(*first.record()));
        assert_eq!(second.verification(), first.verification());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_keeps_submission() {
        let client = client(Duration::from_secs(15));
        let digest = [0xcc; 32];

        let mut pending = client.store(&digest).await.unwrap();
        let early = pending.wait_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(early, None);

        let outcome = pending
            .wait_timeout(Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.is_new());

        // Resolved handles keep answering.
        assert_eq!(pending.wait_timeout(Duration::ZERO).await.unwrap(), Some(outcome));
        assert_eq!(pending.confirmed().await.unwrap(), outcome);
    }

    #[tokio::test]
    async fn test_store_and_watch_phases() {
        let client = client(Duration::ZERO);

        let mut rx = client.store_and_watch(&[0xdd; 32]).await.unwrap();
        assert!(matches!(
            *rx.borrow(),
            RegistrationPhase::Submitted { .. } | RegistrationPhase::Confirmed(_)
        ));

        let phase = rx
            .wait_for(|phase| matches!(phase, RegistrationPhase::Confirmed(_)))
            .await
            .unwrap()
            .clone();
        let RegistrationPhase::Confirmed(Ok(outcome)) = phase else {
            panic!("expected a confirmed registration");
        };
        assert!(outcome.is_new());
    }
}
