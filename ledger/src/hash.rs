//! # Canonical Hashing
//!
//! One block, one digest — regardless of who serialized it or in what field
//! order their encoder happened to emit keys. This determinism is the
//! linchpin of chain validation: a peer that hashes `{proof, index, ...}`
//! must get the same digest as one that hashes `{index, proof, ...}`, or
//! every cross-node check falls apart.
//!
//! ## Canonicalization Rule
//!
//! A block's preimage is its compact JSON encoding with object keys in
//! sorted order. We get the sorting for free: the block is converted to a
//! [`serde_json::Value`], whose object representation is a `BTreeMap` (the
//! crate's default when `preserve_order` is off), so `to_string()` emits
//! keys sorted at every nesting level. The digest is SHA-256 of those
//! bytes, lowercase hex encoded — 64 characters.
//!
//! There is deliberately no second serialization path in this crate.

use sha2::{Digest, Sha256};

use crate::block::Block;

/// Length of a hex-encoded block digest (SHA-256 → 32 bytes → 64 chars).
pub const DIGEST_HEX_LENGTH: usize = 64;

/// Computes the canonical digest of a block.
///
/// Deterministic and side-effect free. The `proof` field participates in
/// the preimage like every other field — that is what makes the mining
/// search meaningful.
pub fn block_digest(block: &Block) -> String {
    // Plain structs of integers, strings, and vectors cannot fail to
    // serialize; a failure here is a programming error in the Block type.
    let canonical = serde_json::to_value(block)
        .expect("block serialization is infallible")
        .to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Vote;
    use sha2::{Digest, Sha256};

    fn sample_block() -> Block {
        Block {
            index: 1,
            timestamp: 1_700_000_000_000,
            votes: vec![Vote::new("alice", "bob")],
            previous_hash: "0".to_string(),
            proof: 99,
        }
    }

    #[test]
    fn digest_is_64_lowercase_hex_chars() {
        let digest = block_digest(&sample_block());
        assert_eq!(digest.len(), DIGEST_HEX_LENGTH);
        assert!(digest
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_is_deterministic() {
        let block = sample_block();
        assert_eq!(block_digest(&block), block_digest(&block));
    }

    #[test]
    fn digest_changes_with_any_field() {
        let base = sample_block();

        let mut proof_changed = base.clone();
        proof_changed.proof += 1;
        assert_ne!(block_digest(&base), block_digest(&proof_changed));

        let mut vote_changed = base.clone();
        vote_changed.votes[0].candidate = "carol".to_string();
        assert_ne!(block_digest(&base), block_digest(&vote_changed));

        let mut link_changed = base;
        link_changed.previous_hash = "1".to_string();
        assert_ne!(block_digest(&link_changed), block_digest(&vote_changed));
    }

    #[test]
    fn digest_ignores_transmission_key_order() {
        // A peer may transmit keys in any order. Parsing their JSON and
        // hashing the canonical form must match our locally computed digest.
        let block = sample_block();
        let shuffled = r#"{
            "proof": 99,
            "previous_hash": "0",
            "votes": [{"to": "bob", "from": "alice"}],
            "index": 1,
            "timestamp": 1700000000000
        }"#;
        let parsed: Block = serde_json::from_str(shuffled).unwrap();
        assert_eq!(block_digest(&block), block_digest(&parsed));
    }

    #[test]
    fn canonical_preimage_has_sorted_keys() {
        // Pin the canonicalization rule itself: the digest must equal
        // SHA-256 over compact JSON with sorted keys at every level.
        let block = sample_block();
        let expected_preimage = concat!(
            r#"{"index":1,"previous_hash":"0","proof":99,"timestamp":1700000000000,"#,
            r#""votes":[{"from":"alice","to":"bob"}]}"#
        );
        let expected = hex::encode(Sha256::digest(expected_preimage.as_bytes()));
        assert_eq!(block_digest(&block), expected);
    }
}
