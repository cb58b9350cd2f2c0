//! Registration records and the log entries that carry them.
//!
//! A [`RegistrationRecord`] is written exactly once per digest and never
//! changes afterwards. Every record enters the ledger as one [`LogEntry`];
//! entries are hash-chained so the log is tamper-evident and the digest
//! index can be rebuilt by replaying them in order.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_entry_bytes, ENTRY_DOMAIN};
use crate::crypto::{EntryHash, Identity};
use crate::types::{DigestKey, LogicalTime};

/// What the ledger remembers about a registered digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Logical time assigned by the ledger (the entry's sequence number).
    pub registered_at: LogicalTime,
    /// Ledger clock reading in Unix milliseconds, never decreasing along the log.
    pub ledger_time_ms: i64,
    /// Who submitted the registration.
    pub registrant: Identity,
}

/// One entry of the append-only registration log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The registered digest.
    pub digest: DigestKey,
    /// The record created for it.
    pub record: RegistrationRecord,
    /// Hash of the previous entry, [`EntryHash::GENESIS`] for the first.
    pub prev_hash: EntryHash,
}

impl LogEntry {
    /// Build the entry that follows `head` (or the first entry when `head` is `None`).
    pub fn next(
        head: Option<&LogHead>,
        digest: DigestKey,
        registrant: Identity,
        now_ms: i64,
    ) -> Self {
        let (registered_at, ledger_time_ms, prev_hash) = match head {
            Some(head) => (head.seq.next(), now_ms.max(head.ledger_time_ms), head.entry_hash),
            None => (LogicalTime(1), now_ms, EntryHash::GENESIS),
        };

        Self {
            digest,
            record: RegistrationRecord {
                registered_at,
                ledger_time_ms,
                registrant,
            },
            prev_hash,
        }
    }

    /// The entry's position in the log.
    pub fn seq(&self) -> u64 {
        self.record.registered_at.0
    }

    /// Compute the entry hash: Blake3(domain || canonical_bytes).
    pub fn compute_hash(&self) -> EntryHash {
        let canonical = canonical_entry_bytes(self);
        let mut input = Vec::with_capacity(ENTRY_DOMAIN.len() + canonical.len());
        input.extend_from_slice(ENTRY_DOMAIN);
        input.extend_from_slice(&canonical);
        EntryHash::hash(&input)
    }

    /// The log head after this entry has been appended.
    pub fn head(&self) -> LogHead {
        LogHead {
            seq: self.record.registered_at,
            entry_hash: self.compute_hash(),
            ledger_time_ms: self.record.ledger_time_ms,
        }
    }
}

/// The latest position of the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogHead {
    /// Sequence number of the latest entry.
    pub seq: LogicalTime,
    /// Hash of the latest entry.
    pub entry_hash: EntryHash,
    /// Ledger time of the latest entry.
    pub ledger_time_ms: i64,
}
