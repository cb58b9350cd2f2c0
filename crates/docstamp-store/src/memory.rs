//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use docstamp_core::{
    validate_entry, DigestKey, Identity, LogEntry, LogHead, LogError, RegistrationRecord,
};

use crate::error::{Result, StoreError};
use crate::traits::{AppendResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// The append-only log. `log[i]` has seq `i + 1`.
    log: Vec<LogEntry>,

    /// Head of the log, cached so appends don't rehash.
    head: Option<LogHead>,

    /// Digest index: digest -> position in `log`.
    index: HashMap<DigestKey, usize>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn append_registration(
        &self,
        digest: &DigestKey,
        registrant: &Identity,
        now_ms: i64,
    ) -> Result<AppendResult> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        if let Some(&pos) = inner.index.get(digest) {
            return Ok(AppendResult::AlreadyRegistered(inner.log[pos].record));
        }

        let entry = LogEntry::next(inner.head.as_ref(), *digest, *registrant, now_ms);
        let pos = inner.log.len();

        inner.head = Some(entry.head());
        inner.index.insert(*digest, pos);
        inner.log.push(entry.clone());

        tracing::debug!(seq = entry.seq(), digest = %digest, "appended registration");
        Ok(AppendResult::Appended(entry))
    }

    async fn head(&self) -> Result<Option<LogHead>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.head)
    }

    async fn entry_count(&self) -> Result<u64> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.log.len() as u64)
    }

    async fn get_entries(&self, after_seq: u64, limit: usize) -> Result<Vec<LogEntry>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;

        let start = usize::try_from(after_seq)
            .unwrap_or(usize::MAX)
            .min(inner.log.len());

        Ok(inner.log[start..].iter().take(limit).cloned().collect())
    }

    async fn get_record(&self, digest: &DigestKey) -> Result<Option<RegistrationRecord>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.index.get(digest).map(|&pos| inner.log[pos].record))
    }

    async fn has_record(&self, digest: &DigestKey) -> Result<bool> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(inner.index.contains_key(digest))
    }

    async fn index_records(&self) -> Result<Vec<(DigestKey, RegistrationRecord)>> {
        let inner = self.inner.read().map_err(|_| StoreError::LockPoisoned)?;

        let mut records: Vec<(DigestKey, RegistrationRecord)> = inner
            .index
            .iter()
            .map(|(digest, &pos)| (*digest, inner.log[pos].record))
            .collect();

        records.sort_by_key(|(digest, _)| *digest);
        Ok(records)
    }

    async fn rebuild_index(&self) -> Result<u64> {
        let mut inner = self.inner.write().map_err(|_| StoreError::LockPoisoned)?;

        let mut index = HashMap::with_capacity(inner.log.len());
        let mut head: Option<LogHead> = None;

        for (pos, entry) in inner.log.iter().enumerate() {
            validate_entry(head.as_ref(), entry)?;
            if let Some(&first) = index.get(&entry.digest) {
                return Err(LogError::DuplicateDigest {
                    digest: entry.digest,
                    first: first as u64 + 1,
                    second: entry.seq(),
                }
                .into());
            }
            index.insert(entry.digest, pos);
            head = Some(entry.head());
        }

        inner.index = index;
        inner.head = head;
        Ok(inner.log.len() as u64)
    }
}
