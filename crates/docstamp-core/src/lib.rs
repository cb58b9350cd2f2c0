//! # Docstamp Core
//!
//! Pure primitives for Docstamp: digests, identities, registration records,
//! and the append-only log they are written to.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over fixed-size byte strings.
//!
//! ## Key Types
//!
//! - [`DigestKey`] - The 32-byte document digest used as the ledger key
//! - [`Identity`] - The public identifier of a registrant
//! - [`RegistrationRecord`] - What the ledger remembers about a digest
//! - [`LogEntry`] - One hash-chained entry of the append-only log
//!
//! ## Canonicalization
//!
//! Log entries are encoded using deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod record;
pub mod types;
pub mod validation;

pub use canonical::{decode_entry, encode_entry};
pub use crypto::{EntryHash, Identity, Keypair};
pub use error::{CoreError, LogError};
pub use record::{LogEntry, LogHead, RegistrationRecord};
pub use types::{DigestKey, LogicalTime, DIGEST_LEN};
pub use validation::{validate_entry, validate_log};
