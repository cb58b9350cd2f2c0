//! In-process transport over a shared [`Ledger`].
//!
//! Submissions go through a bounded queue drained by a single sequencer
//! task, which applies them to the ledger in arrival order and answers each
//! through its confirmation. Queries bypass the queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use docstamp_core::DigestKey;
use docstamp_ledger::{Ledger, QueryResult};
use docstamp_store::Store;

use crate::error::TransportError;
use crate::transport::{
    Confirmation, ConfirmationSender, LedgerTransport, RegisterRequest, SubmissionId,
};

/// Configuration for [`LocalTransport`].
#[derive(Debug, Clone)]
pub struct LocalTransportConfig {
    /// Submissions that may wait for the sequencer before `submit` blocks.
    pub queue_depth: usize,
    /// Pause before applying each submission.
    pub confirmation_delay: Duration,
}

impl Default for LocalTransportConfig {
    fn default() -> Self {
        Self {
            queue_depth: 1024,
            confirmation_delay: Duration::ZERO,
        }
    }
}

struct Submission {
    id: SubmissionId,
    request: RegisterRequest,
    reply: ConfirmationSender,
}

/// Transport to a ledger in the same process.
///
/// Cheap to clone. The sequencer stops once every clone is dropped.
pub struct LocalTransport<S: Store> {
    ledger: Arc<Ledger<S>>,
    queue: mpsc::Sender<Submission>,
    next_id: Arc<AtomicU64>,
}

impl<S: Store> Clone for LocalTransport<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            queue: self.queue.clone(),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<S: Store + 'static> LocalTransport<S> {
    /// Start a sequencer for `ledger` on the current tokio runtime.
    pub fn spawn(ledger: Arc<Ledger<S>>, config: LocalTransportConfig) -> Self {
        let (queue, rx) = mpsc::channel(config.queue_depth.max(1));
        tokio::spawn(run_sequencer(
            Arc::clone(&ledger),
            rx,
            config.confirmation_delay,
        ));

        Self {
            ledger,
            queue,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The ledger behind this transport.
    pub fn ledger(&self) -> &Arc<Ledger<S>> {
        &self.ledger
    }
}

async fn run_sequencer<S: Store>(
    ledger: Arc<Ledger<S>>,
    mut rx: mpsc::Receiver<Submission>,
    delay: Duration,
) {
    while let Some(submission) = rx.recv().await {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let RegisterRequest { digest, registrant } = submission.request;
        let result = ledger
            .register(digest, registrant)
            .await
            .map_err(|e| TransportError::Ledger(e.to_string()));

        if let Err(e) = &result {
            tracing::warn!(id = %submission.id, error = %e, "submission failed in ledger");
        }

        // The submitter may have stopped waiting; the registration stands.
        let _ = submission.reply.send(result);
    }

    tracing::debug!("sequencer stopped");
}

#[async_trait]
impl<S: Store + 'static> LedgerTransport for LocalTransport<S> {
    async fn submit(&self, request: RegisterRequest) -> Result<Confirmation, TransportError> {
        let id = SubmissionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply, confirmation) = Confirmation::channel(id);

        self.queue
            .send(Submission { id, request, reply })
            .await
            .map_err(|_| TransportError::Closed)?;

        Ok(confirmation)
    }

    async fn query(&self, digest: &DigestKey) -> Result<QueryResult, TransportError> {
        self.ledger
            .query(digest)
            .await
            .map_err(|e| TransportError::Ledger(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstamp_core::Identity;
    use docstamp_ledger::{LedgerConfig, RegisterOutcome};
    use docstamp_store::MemoryStore;

    fn transport(delay: Duration) -> LocalTransport<MemoryStore> {
        let ledger = Arc::new(Ledger::new(MemoryStore::new(), LedgerConfig::default()));
        LocalTransport::spawn(
            ledger,
            LocalTransportConfig {
                confirmation_delay: delay,
                ..LocalTransportConfig::default()
            },
        )
    }

    fn request(b: u8) -> RegisterRequest {
        RegisterRequest {
            digest: DigestKey::from_bytes([b; 32]),
            registrant: Identity::from_bytes([0xa1; 32]),
        }
    }

    #[tokio::test]
    async fn test_submissions_apply_in_arrival_order() {
        let transport = transport(Duration::ZERO);

        let first = transport.submit(request(1)).await.unwrap();
        let second = transport.submit(request(2)).await.unwrap();
        assert!(first.id() < second.id());

        let first = first.rx.await.unwrap().unwrap();
        let second = second.rx.await.unwrap().unwrap();
        assert!(first.record().registered_at < second.record().registered_at);
    }

    #[tokio::test]
    async fn test_duplicate_submission_confirms_existing() {
        let transport = transport(Duration::ZERO);

        let a = transport.submit(request(9)).await.unwrap();
        let b = transport.submit(request(9)).await.unwrap();

        let a = a.rx.await.unwrap().unwrap();
        let b = b.rx.await.unwrap().unwrap();
        assert!(matches!(a, RegisterOutcome::Registered(_)));
        assert_eq!(b, RegisterOutcome::AlreadyRegistered(*a.record()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_does_not_wait_for_sequencer() {
        let transport = transport(Duration::from_secs(12));

        let pending = transport.submit(request(5)).await.unwrap();
        let digest = DigestKey::from_bytes([5; 32]);

        // Not applied yet: the sequencer is still in its delay.
        assert!(!transport.query(&digest).await.unwrap().exists);

        pending.rx.await.unwrap().unwrap();
        assert!(transport.query(&digest).await.unwrap().exists);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequencer_drains_queue_then_stops_when_handles_drop() {
        let ledger = Arc::new(Ledger::new(MemoryStore::new(), LedgerConfig::default()));
        let transport = LocalTransport::spawn(
            Arc::clone(&ledger),
            LocalTransportConfig {
                confirmation_delay: Duration::from_secs(3),
                ..LocalTransportConfig::default()
            },
        );
        let clone = transport.clone();

        let pending = clone.submit(request(7)).await.unwrap();
        drop(transport);
        drop(clone);

        // Queued work is still applied after the last handle is gone.
        let outcome = pending.rx.await.unwrap().unwrap();
        assert!(outcome.is_new());

        // Then the sequencer exits and releases its ledger handle.
        for _ in 0..100 {
            if Arc::strong_count(&ledger) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&ledger), 1);
    }
}
