//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;
use std::sync::Arc;

use docstamp_client::{ClientConfig, LocalTransport, LocalTransportConfig, RegistrationClient};
use docstamp_core::{DigestKey, Keypair};
use docstamp_ledger::{Ledger, LedgerConfig, ManualClock};
use docstamp_store::{MemoryStore, SqliteStore, Store};

/// Ledger clock start used by fixtures: 2025-01-14T16:00:00Z.
pub const FIXTURE_EPOCH_MS: i64 = 1_736_870_400_000;

/// Deterministic keypair for the first party.
pub fn alice() -> Keypair {
    Keypair::from_seed(&[0xa1; 32])
}

/// Deterministic keypair for the second party.
pub fn bob() -> Keypair {
    Keypair::from_seed(&[0xb0; 32])
}

/// Deterministic keypair for the third party.
pub fn carol() -> Keypair {
    Keypair::from_seed(&[0xc0; 32])
}

/// Create deterministic keypairs for multi-party tests.
pub fn multi_party_keypairs(count: usize) -> Vec<Keypair> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64).to_le_bytes());
            Keypair::from_seed(&seed)
        })
        .collect()
}

/// A digest whose every byte is `b`, e.g. `digest(0xAA)`.
pub fn digest(b: u8) -> DigestKey {
    DigestKey::from_bytes([b; 32])
}

/// A ledger driven by a manual clock.
pub struct TestLedger<S: Store> {
    pub ledger: Arc<Ledger<S>>,
    pub clock: Arc<ManualClock>,
}

impl TestLedger<MemoryStore> {
    /// A fresh in-memory ledger.
    pub fn memory() -> Self {
        Self::with_store(MemoryStore::new(), LedgerConfig::default())
    }
}

impl TestLedger<SqliteStore> {
    /// A ledger over the SQLite database at `path`.
    pub fn sqlite(path: impl AsRef<Path>) -> docstamp_store::Result<Self> {
        Ok(Self::with_store(
            SqliteStore::open(path)?,
            LedgerConfig::default(),
        ))
    }
}

impl<S: Store + 'static> TestLedger<S> {
    /// A ledger over `store`, with the clock at [`FIXTURE_EPOCH_MS`].
    pub fn with_store(store: S, config: LedgerConfig) -> Self {
        let clock = Arc::new(ManualClock::new(FIXTURE_EPOCH_MS));
        let ledger = Ledger::with_clock(store, config, clock.clone());
        Self {
            ledger: Arc::new(ledger),
            clock,
        }
    }

    /// Move the ledger clock.
    pub fn advance(&self, delta_ms: i64) {
        self.clock.advance(delta_ms);
    }

    /// Start a transport to this ledger. Must run inside a tokio runtime.
    pub fn transport(&self, config: LocalTransportConfig) -> LocalTransport<S> {
        LocalTransport::spawn(Arc::clone(&self.ledger), config)
    }

    /// A client registering as `keypair`, over a fresh default transport.
    pub fn client(&self, keypair: Keypair) -> RegistrationClient<LocalTransport<S>, Keypair> {
        RegistrationClient::new(
            self.transport(LocalTransportConfig::default()),
            keypair,
            ClientConfig::default(),
        )
    }
}
