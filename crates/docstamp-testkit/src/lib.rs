//! # Docstamp Testkit
//!
//! Testing utilities for Docstamp.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Deterministic parties and ledgers driven by a manual clock
//! - **Generators**: Proptest strategies for digests, identities and ledger scripts
//! - **Faults**: A transport wrapper that fails submissions, queries or confirmations
//! - **Vectors**: SHA-256 known answers for the digest producer
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use docstamp_testkit::fixtures::{alice, digest, TestLedger};
//!
//! async fn example() {
//!     let fixture = TestLedger::memory();
//!     let outcome = fixture.ledger.register(digest(0xaa), alice().identity()).await.unwrap();
//!     assert!(outcome.is_new());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use docstamp_testkit::generators::LedgerScript;
//!
//! proptest! {
//!     #[test]
//!     fn scripts_replay(script: LedgerScript) {
//!         // drive a ledger with script.ops ...
//!     }
//! }
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use faults::FaultyTransport;
pub use fixtures::{alice, bob, carol, digest, multi_party_keypairs, TestLedger};
pub use generators::{LedgerOp, LedgerScript};
pub use vectors::{all_vectors, verify_all_vectors, DigestVector};
