//! Proptest generators for property-based testing.

use proptest::prelude::*;

use docstamp_core::{DigestKey, Identity, Keypair, DIGEST_LEN};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    keypair().prop_map(|kp| kp.identity())
}

/// Generate a random digest.
pub fn digest_key() -> impl Strategy<Value = DigestKey> {
    any::<[u8; DIGEST_LEN]>().prop_map(DigestKey::from_bytes)
}

/// Generate byte strings that are never a valid digest.
pub fn malformed_digest() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..DIGEST_LEN),
        prop::collection::vec(any::<u8>(), DIGEST_LEN + 1..=2 * DIGEST_LEN + 1),
    ]
}

/// Generate a clock step, sometimes backwards.
pub fn clock_step() -> impl Strategy<Value = i64> {
    prop_oneof![
        3 => 0i64..=60_000,
        1 => -60_000i64..0,
    ]
}

/// One operation against a ledger.
///
/// Digests and parties are drawn from small pools (indexes into
/// [`LedgerScript::digests`] and [`LedgerScript::parties`]) so that
/// scripts register the same digest more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Register { digest: usize, party: usize },
    Query { digest: usize },
    Tick { delta_ms: i64 },
}

/// A sequence of ledger operations over fixed pools of digests and parties.
#[derive(Debug, Clone)]
pub struct LedgerScript {
    pub digests: Vec<DigestKey>,
    pub parties: Vec<Identity>,
    pub ops: Vec<LedgerOp>,
}

fn ledger_op(digests: usize, parties: usize) -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        4 => (0..digests, 0..parties)
            .prop_map(|(digest, party)| LedgerOp::Register { digest, party }),
        2 => (0..digests).prop_map(|digest| LedgerOp::Query { digest }),
        1 => clock_step().prop_map(|delta_ms| LedgerOp::Tick { delta_ms }),
    ]
}

impl Arbitrary for LedgerScript {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::hash_set(any::<[u8; 32]>(), 1..=6),
            prop::collection::vec(identity(), 1..=3),
        )
            .prop_flat_map(|(digests, parties)| {
                let digests: Vec<DigestKey> =
                    digests.into_iter().map(DigestKey::from_bytes).collect();
                let ops = prop::collection::vec(ledger_op(digests.len(), parties.len()), 0..40);
                (Just(digests), Just(parties), ops)
            })
            .prop_map(|(digests, parties, ops)| LedgerScript {
                digests,
                parties,
                ops,
            })
            .boxed()
    }
}
