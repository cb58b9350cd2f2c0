//! Known-answer vectors for the digest producer.
//!
//! Documents are keyed by their SHA-256 digest. These vectors pin that
//! choice so that digests computed by other tools match the ledger's keys.

use docstamp_core::DigestKey;

/// A known-answer vector.
#[derive(Debug, Clone)]
pub struct DigestVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Document bytes.
    pub document: &'static [u8],
    /// Expected digest (hex, no prefix).
    pub expected_hex: &'static str,
}

/// Get all digest vectors.
pub fn all_vectors() -> Vec<DigestVector> {
    vec![
        DigestVector {
            name: "empty document",
            document: b"",
            expected_hex: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        DigestVector {
            name: "abc",
            document: b"abc",
            expected_hex: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        DigestVector {
            name: "two-block message",
            document: b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq",
            expected_hex: "248d6a61d20638b8e5c026930c3e6039a33ce45964ff2167f6ecedd419db06c1",
        },
        DigestVector {
            name: "quick brown fox",
            document: b"The quick brown fox jumps over the lazy dog",
            expected_hex: "d7a8fbb307d7809469ca9abcb0082e4f8d5651e46d3cdb762d02d0bf37c9e592",
        },
    ]
}

/// The expected digest of a vector.
pub fn expected_digest(vector: &DigestVector) -> Result<DigestKey, String> {
    let bytes = hex::decode(vector.expected_hex).map_err(|e| format!("{}: {}", vector.name, e))?;
    DigestKey::from_slice(&bytes).map_err(|e| format!("{}: {}", vector.name, e))
}

/// Check every vector against [`DigestKey::sha256`].
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let expected = expected_digest(&vector)?;
        let actual = DigestKey::sha256(vector.document);
        if actual != expected {
            return Err(format!(
                "{}: expected {}, got {}",
                vector.name, expected, actual
            ));
        }
    }
    Ok(())
}
