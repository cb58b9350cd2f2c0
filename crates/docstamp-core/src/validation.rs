//! Log validation: sequence, hash chain, time, and write-once checks.

use std::collections::HashMap;

use crate::crypto::EntryHash;
use crate::error::LogError;
use crate::record::{LogEntry, LogHead};
use crate::types::DigestKey;

/// Check that `entry` may directly follow `head`.
///
/// This performs:
/// - Sequence continuity (`head.seq + 1`, or 1 for the first entry)
/// - Hash chain link (`prev_hash == head.entry_hash`, or genesis)
/// - Ledger time never decreasing
pub fn validate_entry(head: Option<&LogHead>, entry: &LogEntry) -> Result<(), LogError> {
    let (expected_seq, expected_prev, min_time) = match head {
        Some(h) => (h.seq.0 + 1, h.entry_hash, h.ledger_time_ms),
        None => (1, EntryHash::GENESIS, i64::MIN),
    };

    if entry.seq() != expected_seq {
        return Err(LogError::SequenceGap {
            expected: expected_seq,
            got: entry.seq(),
        });
    }

    if entry.prev_hash != expected_prev {
        return Err(LogError::BrokenChain { seq: entry.seq() });
    }

    if entry.record.ledger_time_ms < min_time {
        return Err(LogError::TimeRegression {
            seq: entry.seq(),
            previous: min_time,
            current: entry.record.ledger_time_ms,
        });
    }

    Ok(())
}

/// Validate a whole log from genesis.
///
/// Returns the final head (`None` for an empty log).
pub fn validate_log(entries: &[LogEntry]) -> Result<Option<LogHead>, LogError> {
    let mut head: Option<LogHead> = None;
    let mut seen: HashMap<DigestKey, u64> = HashMap::with_capacity(entries.len());

    for entry in entries {
        validate_entry(head.as_ref(), entry)?;

        if let Some(&first) = seen.get(&entry.digest) {
            return Err(LogError::DuplicateDigest {
                digest: entry.digest,
                first,
                second: entry.seq(),
            });
        }
        seen.insert(entry.digest, entry.seq());

        head = Some(entry.head());
    }

    Ok(head)
}
