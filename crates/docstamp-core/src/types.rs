//! Strong type definitions for Docstamp.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CoreError;

/// Length in bytes of every [`DigestKey`].
pub const DIGEST_LEN: usize = 32;

/// A 32-byte document digest, the primary key of the ledger.
///
/// Equality is exact byte equality. The ledger never sees the document
/// itself, only this value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DigestKey(pub [u8; DIGEST_LEN]);

impl DigestKey {
    /// Create a new DigestKey from raw bytes.
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything that is not exactly
    /// [`DIGEST_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| CoreError::MalformedDigest {
            expected: DIGEST_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Compute the SHA-256 digest of a document.
    pub fn sha256(document: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(document);
        Self(hasher.finalize().into())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Convert to lowercase hex, without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex, with or without a leading `0x`.
    ///
    /// Any non-hex character or wrong length is `MalformedDigest`, reporting
    /// the number of bytes the input spells out (a trailing half byte
    /// counts as one).
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let s = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let declared = s.len().div_ceil(2);
        if s.len() != DIGEST_LEN * 2 {
            return Err(CoreError::MalformedDigest {
                expected: DIGEST_LEN,
                actual: declared,
            });
        }
        let bytes = hex::decode(s).map_err(|_| CoreError::MalformedDigest {
            expected: DIGEST_LEN,
            actual: declared,
        })?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for DigestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigestKey({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for DigestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for DigestKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for DigestKey {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for DigestKey {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(slice)
    }
}

/// Ledger-assigned logical timestamp: the log sequence number of the entry
/// that created a record. The first registration happens at `LogicalTime(1)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct LogicalTime(pub u64);

impl LogicalTime {
    /// Before any registration.
    pub const ZERO: Self = Self(0);

    /// The raw sequence number.
    pub const fn seq(&self) -> u64 {
        self.0
    }

    /// The time of the entry after this one.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_hex_roundtrip_with_prefix() {
        let digest = DigestKey::from_bytes([0xaa; 32]);
        let shown = digest.to_string();
        assert!(shown.starts_with("0x"));
        assert_eq!(DigestKey::from_hex(&shown).unwrap(), digest);
        assert_eq!(DigestKey::from_hex(&digest.to_hex()).unwrap(), digest);
    }

    #[test]
    fn test_digest_hex_accepts_uppercase() {
        let upper = "0X".to_string() + &"AB".repeat(32);
        let digest = DigestKey::from_hex(&upper).unwrap();
        assert_eq!(digest, DigestKey::from_bytes([0xab; 32]));
    }

    #[test]
    fn test_digest_wrong_length_is_malformed() {
        let err = DigestKey::from_slice(&[0u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedDigest {
                expected: 32,
                actual: 31
            }
        ));

        let err = DigestKey::from_hex("0xabcd").unwrap_err();
        assert!(matches!(err, CoreError::MalformedDigest { .. }));
    }

    #[test]
    fn test_digest_non_hex_is_malformed() {
        for bad in ["zz".repeat(32), "0x".to_string() + &"zz".repeat(32)] {
            assert!(matches!(
                DigestKey::from_hex(&bad),
                Err(CoreError::MalformedDigest {
                    expected: 32,
                    actual: 32
                })
            ));
        }
    }

    #[test]
    fn test_digest_odd_length_hex_rounds_up() {
        let err = DigestKey::from_hex(&"a".repeat(63)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedDigest {
                expected: 32,
                actual: 32
            }
        ));

        let err = DigestKey::from_hex(&"a".repeat(61)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedDigest {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn test_sha256_known_answer() {
        let digest = DigestKey::sha256(b"abc");
        assert_eq!(
            digest.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_logical_time_ordering() {
        let t1 = LogicalTime(1);
        assert!(t1.next() > t1);
        assert_eq!(LogicalTime::ZERO.next(), t1);
        assert_eq!(format!("{}", t1), "#1");
    }

    mod props {
        use crate::error::CoreError;
        use crate::types::{DigestKey, DIGEST_LEN};
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn wrong_length_never_becomes_a_digest(
                bytes in prop::collection::vec(any::<u8>(), 0..96)
            ) {
                prop_assume!(bytes.len() != DIGEST_LEN);
                let is_malformed = matches!(
                    DigestKey::from_slice(&bytes),
                    Err(CoreError::MalformedDigest { .. })
                );
                prop_assert!(is_malformed);
            }

            #[test]
            fn displayed_digest_parses_back(bytes in any::<[u8; 32]>()) {
                let digest = DigestKey::from_bytes(bytes);
                prop_assert_eq!(DigestKey::from_hex(&digest.to_string()).unwrap(), digest);
            }
        }
    }
}
