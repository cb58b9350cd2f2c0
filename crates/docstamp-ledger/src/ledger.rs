//! The Ledger: write-once digest registration over an append-only log.
//!
//! The ledger owns no state of its own beyond configuration and a clock.
//! Records live in the store; every registration is one log entry and the
//! digest index is derived from the log.

use std::sync::Arc;

use docstamp_core::{DigestKey, Identity, LogEntry, LogHead, RegistrationRecord};
use docstamp_store::{AppendResult, Store, StoreExt};

use crate::clock::{LedgerClock, SystemClock};
use crate::error::{AlreadyRegistered, LedgerError, Result};
use crate::replay::LedgerIndex;

/// Configuration for the Ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Replay the log and compare it with the index when opening.
    pub verify_on_open: bool,
    /// Entries fetched per store read while replaying.
    pub replay_page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            verify_on_open: false,
            replay_page_size: 256,
        }
    }
}

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The digest was new and now has this record.
    Registered(RegistrationRecord),
    /// The digest was already registered. Nothing changed; this is the
    /// record from the first registration.
    AlreadyRegistered(RegistrationRecord),
}

impl RegisterOutcome {
    /// The record the digest maps to after the call, either way.
    pub fn record(&self) -> &RegistrationRecord {
        match self {
            RegisterOutcome::Registered(record) | RegisterOutcome::AlreadyRegistered(record) => {
                record
            }
        }
    }

    /// Whether this call created the record.
    pub fn is_new(&self) -> bool {
        matches!(self, RegisterOutcome::Registered(_))
    }

    /// Treat a conflict as an error.
    pub fn into_result(self) -> std::result::Result<RegistrationRecord, AlreadyRegistered> {
        match self {
            RegisterOutcome::Registered(record) => Ok(record),
            RegisterOutcome::AlreadyRegistered(existing) => Err(AlreadyRegistered { existing }),
        }
    }
}

/// Result of a query.
///
/// `exists` is true exactly when `record` is present. An unknown digest is
/// `exists == false` with no record, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryResult {
    pub exists: bool,
    pub record: Option<RegistrationRecord>,
}

impl QueryResult {
    /// The digest is unknown.
    pub const NOT_FOUND: Self = Self {
        exists: false,
        record: None,
    };
}

impl From<Option<RegistrationRecord>> for QueryResult {
    fn from(record: Option<RegistrationRecord>) -> Self {
        Self {
            exists: record.is_some(),
            record,
        }
    }
}

/// The ledger state machine.
///
/// Explicitly owned; share it with `Arc` between tasks.
pub struct Ledger<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Source of ledger time.
    clock: Arc<dyn LedgerClock>,
    /// Configuration.
    config: LedgerConfig,
}

impl<S: Store> Ledger<S> {
    /// Create a ledger reading time from the system clock.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a ledger with an explicit clock.
    pub fn with_clock(store: S, config: LedgerConfig, clock: Arc<dyn LedgerClock>) -> Self {
        Self {
            store: Arc::new(store),
            clock,
            config,
        }
    }

    /// Create a ledger over existing storage, verifying the index first if
    /// `config.verify_on_open` is set.
    pub async fn open(store: S, config: LedgerConfig) -> Result<Self> {
        let ledger = Self::new(store, config);
        if ledger.config.verify_on_open {
            ledger.verify_index().await?;
        }
        Ok(ledger)
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State Machine
    // ─────────────────────────────────────────────────────────────────────────

    /// Register `digest` for `registrant`.
    ///
    /// Succeeds at most once per digest. Later calls, from anyone, get
    /// `AlreadyRegistered` with the original record and change nothing.
    pub async fn register(
        &self,
        digest: DigestKey,
        registrant: Identity,
    ) -> Result<RegisterOutcome> {
        let now_ms = self.clock.now_millis();

        let outcome = match self
            .store
            .append_registration(&digest, &registrant, now_ms)
            .await?
        {
            AppendResult::Appended(entry) => RegisterOutcome::Registered(entry.record),
            AppendResult::AlreadyRegistered(existing) => {
                RegisterOutcome::AlreadyRegistered(existing)
            }
        };

        tracing::debug!(
            digest = %digest,
            registrant = %registrant,
            registered_at = %outcome.record().registered_at,
            new = outcome.is_new(),
            "register"
        );
        Ok(outcome)
    }

    /// Look up a digest. Pure read.
    pub async fn query(&self, digest: &DigestKey) -> Result<QueryResult> {
        let result = QueryResult::from(self.store.get_record(digest).await?);
        tracing::debug!(digest = %digest, exists = result.exists, "query");
        Ok(result)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Log Access
    // ─────────────────────────────────────────────────────────────────────────

    /// The latest log position, `None` before the first registration.
    pub async fn head(&self) -> Result<Option<LogHead>> {
        Ok(self.store.head().await?)
    }

    /// Number of registrations (equal to the number of log entries).
    pub async fn len(&self) -> Result<u64> {
        Ok(self.store.entry_count().await?)
    }

    /// Whether nothing has been registered.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Up to `limit` log entries after `after_seq`, in order.
    pub async fn entries(&self, after_seq: u64, limit: usize) -> Result<Vec<LogEntry>> {
        Ok(self.store.get_entries(after_seq, limit).await?)
    }

    /// The whole log, in order.
    pub async fn log(&self) -> Result<Vec<LogEntry>> {
        Ok(self.store.all_entries(self.config.replay_page_size).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Replay
    // ─────────────────────────────────────────────────────────────────────────

    /// Replay the stored log from genesis into a fresh index.
    pub async fn replay_log(&self) -> Result<LedgerIndex> {
        let page_size = self.config.replay_page_size.max(1);
        let mut index = LedgerIndex::new();
        let mut after = 0u64;

        loop {
            let page = self.store.get_entries(after, page_size).await?;
            for entry in &page {
                index.apply(entry)?;
            }
            match page.last() {
                Some(last) if page.len() == page_size => after = last.seq(),
                _ => break,
            }
        }

        tracing::info!(entries = index.len(), "replayed log");
        Ok(index)
    }

    /// Replay the log and check it matches the live index exactly.
    ///
    /// Returns the replayed index.
    pub async fn verify_index(&self) -> Result<LedgerIndex> {
        let replayed = self.replay_log().await?;
        let live = self.store.index_records().await?;

        for (digest, record) in &live {
            if replayed.get(digest) != Some(record) {
                tracing::warn!(digest = %digest, "index entry not backed by log");
                return Err(LedgerError::IndexDivergence { digest: *digest });
            }
        }

        if live.len() != replayed.len() {
            let missing = replayed
                .records()
                .map(|(digest, _)| *digest)
                .find(|digest| live.binary_search_by_key(digest, |(d, _)| *d).is_err());
            if let Some(digest) = missing {
                tracing::warn!(digest = %digest, "log entry missing from index");
                return Err(LedgerError::IndexDivergence { digest });
            }
        }

        Ok(replayed)
    }

    /// Discard the derived index and rebuild it from the log.
    ///
    /// Returns the number of entries replayed.
    pub async fn rebuild_index(&self) -> Result<u64> {
        let replayed = self.store.rebuild_index().await?;
        tracing::info!(entries = replayed, "rebuilt index");
        Ok(replayed)
    }
}
