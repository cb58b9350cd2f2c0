//! Ledger properties: write-once registration, query purity, monotonic
//! logical time, and deterministic replay, across both store backends.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;

use docstamp_core::{DigestKey, Identity, LogEntry, LogHead, LogicalTime, RegistrationRecord};
use docstamp_ledger::{
    replay, Ledger, LedgerConfig, LedgerError, QueryResult, RegisterOutcome,
};
use docstamp_store::{AppendResult, MemoryStore, SqliteStore, Store};
use docstamp_testkit::fixtures::{alice, bob, digest, multi_party_keypairs, TestLedger};
use docstamp_testkit::generators::{LedgerOp, LedgerScript};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario
// ─────────────────────────────────────────────────────────────────────────────

async fn alice_and_bob<S: Store + 'static>(fixture: TestLedger<S>) -> anyhow::Result<()> {
    let ledger = &fixture.ledger;
    let (alice, bob) = (alice().identity(), bob().identity());

    let first = ledger.register(digest(0xAA), alice).await?;
    let RegisterOutcome::Registered(t1) = first else {
        anyhow::bail!("expected 0xAA to be new, got {:?}", first);
    };
    assert_eq!(t1.registrant, alice);

    fixture.advance(1_000);
    let conflict = ledger.register(digest(0xAA), bob).await?;
    assert_eq!(conflict, RegisterOutcome::AlreadyRegistered(t1));
    assert_eq!(conflict.into_result().unwrap_err().existing, t1);

    let second = ledger.register(digest(0xBB), bob).await?;
    let RegisterOutcome::Registered(t2) = second else {
        anyhow::bail!("expected 0xBB to be new, got {:?}", second);
    };
    assert!(t2.registered_at > t1.registered_at);
    assert_eq!(t2.registrant, bob);

    assert_eq!(
        ledger.query(&digest(0xAA)).await?,
        QueryResult {
            exists: true,
            record: Some(t1)
        }
    );
    assert_eq!(ledger.query(&digest(0xCC)).await?, QueryResult::NOT_FOUND);
    assert_eq!(ledger.len().await?, 2);
    Ok(())
}

#[tokio::test]
async fn scenario_alice_and_bob_memory() -> anyhow::Result<()> {
    init_tracing();
    alice_and_bob(TestLedger::memory()).await
}

#[tokio::test]
async fn scenario_alice_and_bob_sqlite() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    alice_and_bob(TestLedger::sqlite(dir.path().join("ledger.db"))?).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

async fn race_same_digest<S: Store + 'static>(ledger: Arc<Ledger<S>>) -> anyhow::Result<()> {
    let parties = multi_party_keypairs(16);

    let handles: Vec<_> = parties
        .iter()
        .map(|party| {
            let ledger = Arc::clone(&ledger);
            let registrant = party.identity();
            tokio::spawn(async move { ledger.register(digest(0x77), registrant).await })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await??);
    }

    let winners: Vec<_> = outcomes.iter().filter(|o| o.is_new()).collect();
    assert_eq!(winners.len(), 1, "exactly one registration must win");
    let winner = *winners[0].record();

    for outcome in &outcomes {
        assert_eq!(outcome.record(), &winner);
    }
    assert_eq!(ledger.len().await?, 1);
    assert_eq!(ledger.query(&digest(0x77)).await?.record, Some(winner));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_digest_memory() -> anyhow::Result<()> {
    race_same_digest(TestLedger::memory().ledger).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_digest_sqlite() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    race_same_digest(TestLedger::sqlite(dir.path().join("race.db"))?.ledger).await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_distinct_digests_get_distinct_times() -> anyhow::Result<()> {
    let ledger = TestLedger::memory().ledger;
    let registrant = alice().identity();

    let handles: Vec<_> = (0..32u8)
        .map(|b| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.register(digest(b), registrant).await })
        })
        .collect();

    let mut times = Vec::new();
    for handle in handles {
        times.push(handle.await??.record().registered_at);
    }
    times.sort();
    let expected: Vec<LogicalTime> = (1..=32).map(LogicalTime).collect();
    assert_eq!(times, expected);

    let index = replay(&ledger.log().await?)?;
    assert_eq!(index.len(), 32);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sqlite_ledger_survives_reopen() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("reopen.db");

    let before = {
        let fixture = TestLedger::sqlite(&path)?;
        fixture.ledger.register(digest(1), alice().identity()).await?;
        fixture.advance(500);
        fixture.ledger.register(digest(2), bob().identity()).await?;
        (
            fixture.ledger.query(&digest(2)).await?,
            fixture.ledger.head().await?,
        )
    };

    let config = LedgerConfig {
        verify_on_open: true,
        ..LedgerConfig::default()
    };
    let ledger = Ledger::open(SqliteStore::open(&path)?, config).await?;

    assert_eq!(ledger.query(&digest(2)).await?, before.0);
    assert_eq!(ledger.head().await?, before.1);
    assert_eq!(ledger.rebuild_index().await?, 2);
    assert_eq!(ledger.query(&digest(1)).await?.record.map(|r| r.registrant), Some(alice().identity()));

    // A rebuilt index answers exactly like the one it replaced.
    let replayed = ledger.verify_index().await?;
    assert_eq!(replayed.head(), before.1.as_ref());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Index divergence
// ─────────────────────────────────────────────────────────────────────────────

/// A store whose index has lost one digest the log still holds.
struct StaleIndex {
    inner: MemoryStore,
    hidden: DigestKey,
}

#[async_trait]
impl Store for StaleIndex {
    async fn append_registration(
        &self,
        digest: &DigestKey,
        registrant: &Identity,
        now_ms: i64,
    ) -> docstamp_store::Result<AppendResult> {
        self.inner.append_registration(digest, registrant, now_ms).await
    }

    async fn head(&self) -> docstamp_store::Result<Option<LogHead>> {
        self.inner.head().await
    }

    async fn entry_count(&self) -> docstamp_store::Result<u64> {
        self.inner.entry_count().await
    }

    async fn get_entries(&self, after_seq: u64, limit: usize) -> docstamp_store::Result<Vec<LogEntry>> {
        self.inner.get_entries(after_seq, limit).await
    }

    async fn get_record(
        &self,
        digest: &DigestKey,
    ) -> docstamp_store::Result<Option<RegistrationRecord>> {
        if *digest == self.hidden {
            return Ok(None);
        }
        self.inner.get_record(digest).await
    }

    async fn has_record(&self, digest: &DigestKey) -> docstamp_store::Result<bool> {
        Ok(self.get_record(digest).await?.is_some())
    }

    async fn index_records(&self) -> docstamp_store::Result<Vec<(DigestKey, RegistrationRecord)>> {
        let mut records = self.inner.index_records().await?;
        records.retain(|(digest, _)| *digest != self.hidden);
        Ok(records)
    }

    async fn rebuild_index(&self) -> docstamp_store::Result<u64> {
        self.inner.rebuild_index().await
    }
}

#[tokio::test]
async fn verify_on_open_detects_stale_index() -> anyhow::Result<()> {
    let inner = MemoryStore::new();
    for b in 1..=3u8 {
        inner.append_registration(&digest(b), &alice().identity(), 0).await?;
    }
    let store = StaleIndex {
        inner,
        hidden: digest(2),
    };

    let config = LedgerConfig {
        verify_on_open: true,
        ..LedgerConfig::default()
    };
    match Ledger::open(store, config).await {
        Err(LedgerError::IndexDivergence { digest: d }) => assert_eq!(d, digest(2)),
        Err(e) => anyhow::bail!("unexpected error: {}", e),
        Ok(_) => anyhow::bail!("stale index was not detected"),
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Drive a ledger with a random script and check it against a plain map.
    #[test]
    fn ledger_matches_write_once_model(script: LedgerScript) {
        runtime().block_on(async {
            let fixture = TestLedger::memory();
            let ledger = &fixture.ledger;
            let mut model: HashMap<DigestKey, RegistrationRecord> = HashMap::new();

            for op in &script.ops {
                match *op {
                    LedgerOp::Register { digest, party } => {
                        let key = script.digests[digest];
                        let outcome = ledger.register(key, script.parties[party]).await.unwrap();
                        match model.get(&key) {
                            Some(existing) => {
                                prop_assert_eq!(outcome, RegisterOutcome::AlreadyRegistered(*existing));
                            }
                            None => {
                                prop_assert!(outcome.is_new());
                                prop_assert_eq!(outcome.record().registrant, script.parties[party]);
                                model.insert(key, *outcome.record());
                            }
                        }
                    }
                    LedgerOp::Query { digest } => {
                        let key = script.digests[digest];
                        let head = ledger.head().await.unwrap();
                        let result = ledger.query(&key).await.unwrap();
                        prop_assert_eq!(result, QueryResult::from(model.get(&key).copied()));
                        prop_assert_eq!(result.exists, result.record.is_some());
                        // Queries change nothing.
                        prop_assert_eq!(ledger.head().await.unwrap(), head);
                    }
                    LedgerOp::Tick { delta_ms } => fixture.advance(delta_ms),
                }
            }

            let log = ledger.log().await.unwrap();
            prop_assert_eq!(log.len(), model.len());
            for pair in log.windows(2) {
                prop_assert!(pair[0].record.registered_at < pair[1].record.registered_at);
                prop_assert!(pair[0].record.ledger_time_ms <= pair[1].record.ledger_time_ms);
            }

            // Replay from empty state reproduces the index, every time.
            let replayed = replay(&log).unwrap();
            prop_assert_eq!(&replayed, &replay(&log).unwrap());
            prop_assert_eq!(replayed.len(), model.len());
            for (key, record) in &model {
                prop_assert_eq!(replayed.get(key), Some(record));
            }
            let verified = ledger.verify_index().await.unwrap();
            prop_assert_eq!(verified, replayed);
            Ok(())
        })?;
    }

    /// Unknown digests read as absent without touching the log.
    #[test]
    fn unknown_digest_is_absent(key in docstamp_testkit::generators::digest_key()) {
        runtime().block_on(async {
            let fixture = TestLedger::memory();
            let result = fixture.ledger.query(&key).await.unwrap();
            prop_assert_eq!(result, QueryResult::NOT_FOUND);
            prop_assert!(fixture.ledger.is_empty().await.unwrap());
            Ok(())
        })?;
    }
}
