//! # Block and Chain Validation
//!
//! Two checks, two scopes. [`is_valid_block`] asks "does this block's own
//! digest clear the difficulty bar?" and nothing else — linkage to a
//! predecessor is explicitly not its job. [`is_valid_chain`] walks the
//! whole sequence and checks, for every block after the first, that it
//! links to its predecessor's digest and clears the bar itself.
//!
//! Chains of length 0 or 1 are trivially valid: there are no pairs to
//! check, and the first block's own proof is not re-validated. Locally
//! constructed genesis blocks are mined and would pass anyway; the
//! leniency only matters for chains received from peers, and it matches
//! what every other node enforces.

use crate::block::Block;
use crate::config::DIFFICULTY_PREFIX;
use crate::hash::block_digest;

/// Returns `true` iff the block's canonical digest starts with the
/// difficulty prefix. Does not inspect linkage or position.
pub fn is_valid_block(block: &Block) -> bool {
    block_digest(block).starts_with(DIFFICULTY_PREFIX)
}

/// Returns `true` iff every block after the first links to its
/// predecessor's digest and satisfies the difficulty predicate.
///
/// Short-circuits on the first failure.
pub fn is_valid_chain(chain: &[Block]) -> bool {
    for i in 1..chain.len() {
        let prev = &chain[i - 1];
        let block = &chain[i];

        if block.previous_hash != block_digest(prev) {
            tracing::debug!(index = block.index, "chain link mismatch");
            return false;
        }
        if !is_valid_block(block) {
            tracing::debug!(index = block.index, "block fails difficulty predicate");
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Vote;
    use crate::miner::{mine, MineControl};

    /// Mines a chain of `count` linked blocks from a fresh genesis.
    fn mined_chain(count: usize) -> Vec<Block> {
        let mut genesis = Block {
            index: 0,
            timestamp: 1_700_000_000_000,
            votes: Vec::new(),
            previous_hash: "0".to_string(),
            proof: 0,
        };
        mine(&mut genesis, &MineControl::unbounded()).unwrap();

        let mut chain = vec![genesis];
        for i in 1..count {
            let prev_digest = block_digest(&chain[i - 1]);
            let mut block = Block {
                index: i as u64,
                timestamp: 1_700_000_000_000 + i as u64,
                votes: vec![Vote::new(format!("voter_{i}"), "bob")],
                previous_hash: prev_digest,
                proof: 0,
            };
            mine(&mut block, &MineControl::unbounded()).unwrap();
            chain.push(block);
        }
        chain
    }

    #[test]
    fn mined_block_is_valid() {
        let chain = mined_chain(1);
        assert!(is_valid_block(&chain[0]));
    }

    #[test]
    fn unmined_block_is_invalid() {
        // A freshly assembled candidate has proof 0, which essentially
        // never clears a 4-nibble bar.
        let candidate = Block::candidate(5, vec![Vote::new("a", "b")], "0".repeat(64));
        assert!(!is_valid_block(&candidate));
    }

    #[test]
    fn empty_and_singleton_chains_are_trivially_valid() {
        assert!(is_valid_chain(&[]));
        assert!(is_valid_chain(&mined_chain(1)));
    }

    #[test]
    fn well_formed_chain_is_valid() {
        assert!(is_valid_chain(&mined_chain(4)));
    }

    #[test]
    fn tampered_link_is_rejected() {
        let mut chain = mined_chain(3);
        chain[2].previous_hash = "f".repeat(64);
        assert!(!is_valid_chain(&chain));
    }

    #[test]
    fn tampered_vote_is_rejected() {
        // Editing a committed vote changes the digest, so the block no
        // longer clears the difficulty bar (and its successor's link
        // would break too — the proof check fires first here).
        let mut chain = mined_chain(3);
        chain[1].votes[0].candidate = "mallory".to_string();
        assert!(!is_valid_chain(&chain));
    }

    #[test]
    fn genesis_proof_is_not_rechecked() {
        // First-block leniency: a chain whose head was never mined still
        // validates, as long as every later block links and proves.
        let mut chain = mined_chain(3);
        chain[0].proof = 0; // almost certainly invalid now
        chain[1].previous_hash = block_digest(&chain[0]);
        // Block 1's stored proof no longer matches its new previous_hash,
        // so the chain fails — but only at index 1, not at genesis.
        assert!(!is_valid_chain(&chain));

        // Re-mine block 1 and relink block 2; now the chain passes even
        // though genesis itself fails the predicate.
        mine(&mut chain[1], &MineControl::unbounded()).unwrap();
        chain[2].previous_hash = block_digest(&chain[1]);
        mine(&mut chain[2], &MineControl::unbounded()).unwrap();
        assert!(!is_valid_block(&chain[0]));
        assert!(is_valid_chain(&chain));
    }
}
