//! # Docstamp Ledger
//!
//! The authoritative ledger for Docstamp: a write-once map from document
//! digests to registration records, written through an append-only,
//! hash-chained log.
//!
//! ## Key Concepts
//!
//! - **Write-once**: The first registration of a digest wins. Every later
//!   attempt returns the existing record as `AlreadyRegistered`.
//! - **Logical time**: A record's `registered_at` is its log position,
//!   assigned by the ledger and strictly increasing.
//! - **Replay**: The digest index is derived state and can be rebuilt by
//!   replaying the log from genesis.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docstamp_core::{DigestKey, Keypair};
//! use docstamp_ledger::{Ledger, LedgerConfig, RegisterOutcome};
//! use docstamp_store::SqliteStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open("docstamp.db")?;
//!     let ledger = Ledger::open(store, LedgerConfig::default()).await?;
//!
//!     let digest = DigestKey::sha256(b"contract.pdf contents");
//!     let registrant = Keypair::generate().identity();
//!
//!     match ledger.register(digest, registrant).await? {
//!         RegisterOutcome::Registered(record) => println!("new at {}", record.registered_at),
//!         RegisterOutcome::AlreadyRegistered(record) => println!("exists since {}", record.registered_at),
//!     }
//!
//!     let result = ledger.query(&digest).await?;
//!     assert!(result.exists);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod error;
pub mod ledger;
pub mod replay;

pub use docstamp_core as core;
pub use docstamp_store as store;

pub use clock::{LedgerClock, ManualClock, SystemClock};
pub use error::{AlreadyRegistered, LedgerError, ReplayError, Result};
pub use ledger::{Ledger, LedgerConfig, QueryResult, RegisterOutcome};
pub use replay::{replay, LedgerIndex};
