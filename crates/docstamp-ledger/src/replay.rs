//! Deterministic replay of the registration log.
//!
//! The digest index is derived state: applying the log in sequence order to
//! an empty index must reproduce it exactly. Replay re-checks every log
//! invariant on the way, so a replayed index is also a proof that the log
//! is well-formed.

use std::collections::BTreeMap;

use docstamp_core::{validate_entry, DigestKey, LogEntry, LogError, LogHead, RegistrationRecord};

use crate::error::ReplayError;

/// An index rebuilt from the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerIndex {
    records: BTreeMap<DigestKey, RegistrationRecord>,
    head: Option<LogHead>,
}

impl LedgerIndex {
    /// An empty index, before any entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the next log entry.
    ///
    /// The entry must directly follow the current head and must not register
    /// a digest that is already present.
    pub fn apply(&mut self, entry: &LogEntry) -> Result<(), ReplayError> {
        validate_entry(self.head.as_ref(), entry)?;

        if let Some(first) = self.records.get(&entry.digest) {
            return Err(LogError::DuplicateDigest {
                digest: entry.digest,
                first: first.registered_at.seq(),
                second: entry.seq(),
            }
            .into());
        }

        self.records.insert(entry.digest, entry.record);
        self.head = Some(entry.head());
        Ok(())
    }

    /// Look up a digest.
    pub fn get(&self, digest: &DigestKey) -> Option<&RegistrationRecord> {
        self.records.get(digest)
    }

    /// Number of registered digests.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Head of the replayed log.
    pub fn head(&self) -> Option<&LogHead> {
        self.head.as_ref()
    }

    /// Records ordered by digest.
    pub fn records(&self) -> impl Iterator<Item = (&DigestKey, &RegistrationRecord)> {
        self.records.iter()
    }
}

/// Rebuild an index from a complete log, starting from empty state.
pub fn replay<'a, I>(entries: I) -> Result<LedgerIndex, ReplayError>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut index = LedgerIndex::new();
    for entry in entries {
        index.apply(entry)?;
    }
    Ok(index)
}
