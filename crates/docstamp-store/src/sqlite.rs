//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Docstamp. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use docstamp_core::{
    decode_entry, encode_entry, validate_entry, DigestKey, EntryHash, Identity, LogEntry,
    LogError, LogHead, LogicalTime, RegistrationRecord,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AppendResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }
}

// Decode a log row, checking the canonical bytes agree with the indexed seq.
fn decode_row(seq: i64, canonical: &[u8]) -> Result<LogEntry> {
    let entry = decode_entry(canonical).map_err(|e| {
        tracing::warn!(seq, error = %e, "undecodable log row");
        e
    })?;
    if entry.seq() as i64 != seq {
        tracing::warn!(seq, decoded = entry.seq(), "log row seq mismatch");
        return Err(StoreError::InvalidData(format!(
            "log row {} holds entry with seq {}",
            seq,
            entry.seq()
        )));
    }
    Ok(entry)
}

fn blob32(bytes: Vec<u8>, column: &str) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|b: Vec<u8>| {
        StoreError::InvalidData(format!("{} has {} bytes, expected 32", column, b.len()))
    })
}

fn read_head(conn: &Connection) -> Result<Option<LogHead>> {
    let row: Option<(i64, Vec<u8>, i64)> = conn
        .query_row(
            "SELECT seq, entry_hash, ledger_time_ms FROM log ORDER BY seq DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    row.map(|(seq, hash, ledger_time_ms)| {
        Ok(LogHead {
            seq: LogicalTime(seq as u64),
            entry_hash: EntryHash::from_bytes(blob32(hash, "entry_hash")?),
            ledger_time_ms,
        })
    })
    .transpose()
}

fn read_record(conn: &Connection, digest: &DigestKey) -> Result<Option<RegistrationRecord>> {
    let row: Option<(i64, Vec<u8>)> = conn
        .query_row(
            "SELECT l.seq, l.canonical_bytes
             FROM digest_index i JOIN log l ON l.seq = i.seq
             WHERE i.digest = ?1",
            params![digest.as_bytes().as_slice()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(seq, canonical)| decode_row(seq, &canonical).map(|entry| entry.record))
        .transpose()
}

#[async_trait]
impl Store for SqliteStore {
    async fn append_registration(
        &self,
        digest: &DigestKey,
        registrant: &Identity,
        now_ms: i64,
    ) -> Result<AppendResult> {
        let digest = *digest;
        let registrant = *registrant;

        self.run(move |conn| {
            // IMMEDIATE takes the write lock up front so the absence check
            // and the insert cannot interleave with another writer.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(existing) = read_record(&tx, &digest)? {
                return Ok(AppendResult::AlreadyRegistered(existing));
            }

            let head = read_head(&tx)?;
            let entry = LogEntry::next(head.as_ref(), digest, registrant, now_ms);
            let canonical = encode_entry(&entry);
            let entry_hash = entry.compute_hash();

            tx.execute(
                "INSERT INTO log (
                    seq, digest, registrant, ledger_time_ms, prev_hash,
                    entry_hash, canonical_bytes
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.seq() as i64,
                    entry.digest.as_bytes().as_slice(),
                    entry.record.registrant.as_bytes().as_slice(),
                    entry.record.ledger_time_ms,
                    entry.prev_hash.as_bytes().as_slice(),
                    entry_hash.as_bytes().as_slice(),
                    canonical.as_slice(),
                ],
            )?;

            tx.execute(
                "INSERT INTO digest_index (digest, seq) VALUES (?1, ?2)",
                params![entry.digest.as_bytes().as_slice(), entry.seq() as i64],
            )?;

            tx.commit()?;

            tracing::debug!(seq = entry.seq(), digest = %entry.digest, "appended registration");
            Ok(AppendResult::Appended(entry))
        })
        .await
    }

    async fn head(&self) -> Result<Option<LogHead>> {
        self.run(|conn| read_head(conn)).await
    }

    async fn entry_count(&self) -> Result<u64> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM log", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
    }

    async fn get_entries(&self, after_seq: u64, limit: usize) -> Result<Vec<LogEntry>> {
        // seq values are stored as i64; anything beyond that has nothing after it.
        let Ok(after_seq) = i64::try_from(after_seq) else {
            return Ok(Vec::new());
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, canonical_bytes FROM log WHERE seq > ?1 ORDER BY seq LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(params![after_seq, limit], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(seq, canonical)| decode_row(seq, &canonical))
                .collect()
        })
        .await
    }

    async fn get_record(&self, digest: &DigestKey) -> Result<Option<RegistrationRecord>> {
        let digest = *digest;
        self.run(move |conn| read_record(conn, &digest)).await
    }

    async fn has_record(&self, digest: &DigestKey) -> Result<bool> {
        let digest = *digest;

        self.run(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM digest_index WHERE digest = ?1)",
                params![digest.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn index_records(&self) -> Result<Vec<(DigestKey, RegistrationRecord)>> {
        self.run(|conn| {
            let mut stmt = conn.prepare(
                "SELECT l.seq, l.canonical_bytes
                 FROM digest_index i JOIN log l ON l.seq = i.seq
                 ORDER BY i.digest",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(seq, canonical)| {
                    decode_row(seq, &canonical).map(|entry| (entry.digest, entry.record))
                })
                .collect()
        })
        .await
    }

    async fn rebuild_index(&self) -> Result<u64> {
        self.run(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM digest_index", [])?;

            let rows = {
                let mut stmt =
                    tx.prepare("SELECT seq, entry_hash, canonical_bytes FROM log ORDER BY seq")?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, Vec<u8>>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            };

            let mut head: Option<LogHead> = None;
            for (seq, stored_hash, canonical) in rows {
                let entry = decode_row(seq, &canonical)?;
                validate_entry(head.as_ref(), &entry)?;

                let next = entry.head();
                if next.entry_hash.as_bytes() != &blob32(stored_hash, "entry_hash")? {
                    return Err(LogError::BrokenChain { seq: entry.seq() }.into());
                }

                tx.execute(
                    "INSERT INTO digest_index (digest, seq) VALUES (?1, ?2)",
                    params![entry.digest.as_bytes().as_slice(), seq],
                )?;
                head = Some(next);
            }

            tx.commit()?;

            let replayed = head.map(|h| h.seq.0).unwrap_or(0);
            tracing::info!(entries = replayed, "rebuilt digest index");
            Ok(replayed)
        })
        .await
    }
}
