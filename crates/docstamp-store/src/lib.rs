//! # Docstamp Store
//!
//! Storage abstraction for the Docstamp ledger. Provides a trait-based interface
//! for the append-only registration log and its digest index, with SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`AppendResult`] - Result of appending a registration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docstamp_core::{DigestKey, Keypair};
//! use docstamp_store::{AppendResult, SqliteStore, Store};
//!
//! async fn example() -> docstamp_store::Result<()> {
//!     let store = SqliteStore::open("docstamp.db")?;
//!
//!     let digest = DigestKey::sha256(b"hello");
//!     let registrant = Keypair::generate().identity();
//!     match store.append_registration(&digest, &registrant, 0).await? {
//!         AppendResult::Appended(entry) => println!("registered at {}", entry.record.registered_at),
//!         AppendResult::AlreadyRegistered(record) => println!("already at {}", record.registered_at),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Write-once appends**: A second append for the same digest returns
//!   `AlreadyRegistered` with the original record and writes nothing
//! - **Gap-free sequence**: The store assigns `seq`, so the log has no holes
//! - **Hash chain**: Each entry carries the hash of its predecessor
//! - **Rebuildable index**: `rebuild_index` replays the log and re-validates it

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AppendResult, Store, StoreExt};
