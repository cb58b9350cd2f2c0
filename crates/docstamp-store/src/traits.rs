//! Store trait: the abstract interface for the registration log.
//!
//! This trait allows the ledger to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use docstamp_core::{DigestKey, Identity, LogEntry, LogHead, RegistrationRecord};

use crate::error::Result;

/// Result of appending a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// The digest was new: this entry was appended and indexed.
    Appended(LogEntry),
    /// The digest was already registered (not an error). Nothing was written.
    AlreadyRegistered(RegistrationRecord),
}

/// The Store trait: async interface for the append-only log and its index.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Write-once**: `append_registration` inserts only if the digest is absent.
///   The check and the insert happen under one lock/transaction, so concurrent
///   appends of the same digest produce exactly one entry.
/// - **Store-assigned position**: the entry's sequence number, previous hash and
///   clamped ledger time are derived from the current head inside that same
///   critical section.
/// - **Derived index**: the digest index can always be rebuilt from the log.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Log Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a registration for `digest` if it has none yet.
    ///
    /// # Arguments
    /// - `digest`: The key to register.
    /// - `registrant`: Identity recorded as the registrant.
    /// - `now_ms`: The ledger clock reading; raised to the head's time if lower.
    ///
    /// # Returns
    /// - `Appended` with the new entry if the digest was absent.
    /// - `AlreadyRegistered` with the untouched existing record otherwise.
    async fn append_registration(
        &self,
        digest: &DigestKey,
        registrant: &Identity,
        now_ms: i64,
    ) -> Result<AppendResult>;

    /// Get the current head of the log (`None` when empty).
    async fn head(&self) -> Result<Option<LogHead>>;

    /// Number of entries in the log.
    async fn entry_count(&self) -> Result<u64>;

    /// Get up to `limit` entries with `seq > after_seq`, ordered by seq.
    async fn get_entries(&self, after_seq: u64, limit: usize) -> Result<Vec<LogEntry>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Index Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up the record for a digest.
    async fn get_record(&self, digest: &DigestKey) -> Result<Option<RegistrationRecord>>;

    /// Check if a digest is registered.
    async fn has_record(&self, digest: &DigestKey) -> Result<bool>;

    /// Snapshot of the live index, ordered by digest.
    async fn index_records(&self) -> Result<Vec<(DigestKey, RegistrationRecord)>>;

    /// Discard the index and rebuild it by replaying the log in order.
    ///
    /// Validates sequence, hash chain and time along the way. Returns the
    /// number of entries replayed.
    async fn rebuild_index(&self) -> Result<u64>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Read the whole log, `page_size` entries at a time.
    fn all_entries(
        &self,
        page_size: usize,
    ) -> impl std::future::Future<Output = Result<Vec<LogEntry>>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn all_entries(&self, page_size: usize) -> Result<Vec<LogEntry>> {
        let page_size = page_size.max(1);
        let mut entries = Vec::new();
        let mut after = 0u64;

        loop {
            let page = self.get_entries(after, page_size).await?;
            let Some(last) = page.last() else {
                break;
            };
            after = last.seq();
            let done = page.len() < page_size;
            entries.extend(page);
            if done {
                break;
            }
        }

        Ok(entries)
    }
}
