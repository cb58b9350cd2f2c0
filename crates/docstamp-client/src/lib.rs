//! # Docstamp Client
//!
//! Store and verify document digests against a Docstamp ledger.
//!
//! ## Overview
//!
//! - [`RegistrationClient::store`] submits a digest and returns a
//!   [`PendingRegistration`]; awaiting it yields a [`StoreOutcome`].
//! - [`RegistrationClient::verify`] returns [`Verification::NotFound`] or
//!   [`Verification::Verified`] with the ledger's record.
//! - [`LedgerTransport`] is the seam to the ledger; [`LocalTransport`]
//!   reaches a ledger in the same process.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docstamp_client::{ClientConfig, LocalTransport, LocalTransportConfig, RegistrationClient};
//! use docstamp_core::{DigestKey, Keypair};
//! use docstamp_ledger::{Ledger, LedgerConfig};
//! use docstamp_store::MemoryStore;
//!
//! async fn example() -> Result<(), docstamp_client::ClientError> {
//!     let ledger = Arc::new(Ledger::new(MemoryStore::new(), LedgerConfig::default()));
//!     let transport = LocalTransport::spawn(ledger, LocalTransportConfig::default());
//!     let client = RegistrationClient::new(transport, Keypair::generate(), ClientConfig::default());
//!
//!     let digest = DigestKey::sha256(b"document bytes");
//!     let pending = client.store(digest.as_bytes()).await?;
//!     println!("submitted as {}", pending.id());
//!
//!     let outcome = pending.confirmed().await?;
//!     println!("registered at {}", outcome.record().registered_at);
//!
//!     let verification = client.verify(digest.as_bytes()).await?;
//!     assert!(verification.is_verified());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod local;
pub mod transport;

pub use client::{
    ClientConfig, PendingRegistration, RegistrationClient, RegistrationPhase, StoreOutcome,
    Verification,
};
pub use error::{ClientError, Result, TransportError};
pub use local::{LocalTransport, LocalTransportConfig};
pub use transport::{
    Confirmation, ConfirmationResult, ConfirmationSender, IdentityProvider, LedgerTransport,
    RegisterRequest, SubmissionId,
};
