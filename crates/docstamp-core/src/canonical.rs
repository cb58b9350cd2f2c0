//! Canonical CBOR encoding of log entries.
//!
//! An entry is encoded as a definite-length CBOR array (RFC 8949) of five items,
//! in this order:
//!
//! ```text
//! [ digest: bytes(32), registered_at: uint, ledger_time_ms: int,
//!   registrant: bytes(32), prev_hash: bytes(32) ]
//! ```
//!
//! Integers use their smallest valid encoding. The entry hash is computed over
//! these bytes, so this layout is frozen: changing it breaks every stored chain.

use ciborium::value::Value;

use crate::crypto::{EntryHash, Identity};
use crate::error::CoreError;
use crate::record::{LogEntry, RegistrationRecord};
use crate::types::{DigestKey, LogicalTime, DIGEST_LEN};

/// Domain separation prefix for entry hashes.
pub const ENTRY_DOMAIN: &[u8] = b"docstamp/log-entry/v1";

const ENTRY_FIELDS: u64 = 5;

/// Encode a log entry to canonical CBOR bytes.
pub fn canonical_entry_bytes(entry: &LogEntry) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);
    encode_uint(&mut buf, 4, ENTRY_FIELDS);
    encode_bytes(&mut buf, entry.digest.as_bytes());
    encode_uint(&mut buf, 0, entry.record.registered_at.0);
    encode_int(&mut buf, entry.record.ledger_time_ms);
    encode_bytes(&mut buf, entry.record.registrant.as_bytes());
    encode_bytes(&mut buf, entry.prev_hash.as_bytes());
    buf
}

/// Encode a log entry for storage or export.
pub fn encode_entry(entry: &LogEntry) -> Vec<u8> {
    canonical_entry_bytes(entry)
}

/// Decode a log entry from canonical CBOR bytes.
pub fn decode_entry(bytes: &[u8]) -> Result<LogEntry, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let items = match value {
        Value::Array(items) if items.len() == ENTRY_FIELDS as usize => items,
        _ => {
            return Err(CoreError::DecodingError(
                "expected array of 5 entry fields".into(),
            ))
        }
    };

    let digest = DigestKey::from_slice(as_bytes(&items[0], "digest")?)?;
    let registered_at = match &items[1] {
        Value::Integer(i) => u64::try_from(*i)
            .map_err(|_| CoreError::DecodingError("registered_at out of range".into()))?,
        _ => return Err(CoreError::DecodingError("invalid registered_at".into())),
    };
    let ledger_time_ms = match &items[2] {
        Value::Integer(i) => i64::try_from(*i)
            .map_err(|_| CoreError::DecodingError("ledger_time_ms out of range".into()))?,
        _ => return Err(CoreError::DecodingError("invalid ledger_time_ms".into())),
    };
    let registrant = Identity::from_bytes(as_array32(&items[3], "registrant")?);
    let prev_hash = EntryHash::from_bytes(as_array32(&items[4], "prev_hash")?);

    let entry = LogEntry {
        digest,
        record: RegistrationRecord {
            registered_at: LogicalTime(registered_at),
            ledger_time_ms,
            registrant,
        },
        prev_hash,
    };

    // Reject non-canonical encodings of the same values.
    if canonical_entry_bytes(&entry) != bytes {
        return Err(CoreError::DecodingError("non-canonical entry encoding".into()));
    }

    Ok(entry)
}

fn as_bytes<'a>(value: &'a Value, field: &str) -> Result<&'a [u8], CoreError> {
    match value {
        Value::Bytes(b) => Ok(b),
        _ => Err(CoreError::DecodingError(format!("invalid {}", field))),
    }
}

fn as_array32(value: &Value, field: &str) -> Result<[u8; DIGEST_LEN], CoreError> {
    as_bytes(value, field)?
        .try_into()
        .map_err(|_| CoreError::DecodingError(format!("{} must be 32 bytes", field)))
}

fn encode_int(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}
