//! Fault injection for the client/ledger seam.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use docstamp_client::{Confirmation, LedgerTransport, RegisterRequest, TransportError};
use docstamp_core::DigestKey;
use docstamp_ledger::QueryResult;

/// A transport that fails on demand before delegating to `inner`.
pub struct FaultyTransport<T> {
    inner: T,
    failing_submits: AtomicU32,
    failing_queries: AtomicU32,
    drop_confirmations: AtomicBool,
    submit_calls: AtomicU32,
}

impl<T: LedgerTransport> FaultyTransport<T> {
    /// Wrap `inner` with no faults armed.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            failing_submits: AtomicU32::new(0),
            failing_queries: AtomicU32::new(0),
            drop_confirmations: AtomicBool::new(false),
            submit_calls: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` submissions with `Unavailable`.
    pub fn fail_submits(&self, n: u32) {
        self.failing_submits.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` queries with `Unavailable`.
    pub fn fail_queries(&self, n: u32) {
        self.failing_queries.store(n, Ordering::SeqCst);
    }

    /// Deliver submissions to the ledger but lose their confirmations.
    pub fn drop_confirmations(&self, drop: bool) {
        self.drop_confirmations.store(drop, Ordering::SeqCst);
    }

    /// Number of `submit` calls seen, failed ones included.
    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

// Consume one armed failure, if any.
fn take_fault(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl<T: LedgerTransport> LedgerTransport for FaultyTransport<T> {
    async fn submit(&self, request: RegisterRequest) -> Result<Confirmation, TransportError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        if take_fault(&self.failing_submits) {
            return Err(TransportError::Unavailable("injected submit fault".into()));
        }

        let confirmation = self.inner.submit(request).await?;
        if self.drop_confirmations.load(Ordering::SeqCst) {
            let (lost, detached) = Confirmation::channel(confirmation.id());
            drop(lost);
            return Ok(detached);
        }

        Ok(confirmation)
    }

    async fn query(&self, digest: &DigestKey) -> Result<QueryResult, TransportError> {
        if take_fault(&self.failing_queries) {
            return Err(TransportError::Unavailable("injected query fault".into()));
        }
        self.inner.query(digest).await
    }
}
