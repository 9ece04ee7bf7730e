//! # The Ledger
//!
//! An append-only chain of blocks plus the pending-vote pool — the one
//! piece of mutable state a TALLY node owns. Construction mines the
//! genesis block, so a ledger is never empty and `current_head` failing is
//! a programming error, not a runtime condition.
//!
//! ## Ownership of the pending pool
//!
//! Mining moves the pool into the candidate block with `std::mem::take` —
//! an explicit ownership transfer, never an aliased list that gets cleared
//! behind the block's back. If the proof search is cancelled or hits its
//! cap, the votes are moved straight back into the pool, so no recorded
//! vote is ever silently dropped.
//!
//! ## Concurrency contract
//!
//! The ledger itself is a plain value. Callers that serve concurrent
//! requests must make `record_vote`, `mine_block`, and `replace_chain`
//! mutually exclusive (the node wraps the ledger in a `parking_lot::RwLock`
//! and takes the write lock for all three). Interleaving a vote between a
//! mine's pool-read and pool-clear, or swapping the chain under an
//! in-flight mine, corrupts the pool — the `&mut self` receivers make the
//! requirement explicit.

use thiserror::Error;

use crate::block::{Block, Vote};
use crate::config::GENESIS_PREVIOUS_HASH;
use crate::hash::block_digest;
use crate::miner::{self, MineControl, MineError};

// ---------------------------------------------------------------------------
// LedgerError
// ---------------------------------------------------------------------------

/// Errors surfaced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The chain has no blocks. Unreachable when the ledger was built via
    /// [`Ledger::new`]; surfaced as an error rather than a panic so the
    /// invariant violation is diagnosable instead of fatal.
    #[error("ledger has no blocks; the genesis invariant was violated")]
    EmptyLedger,

    /// The proof search ended without a proof (cancelled or capped).
    #[error(transparent)]
    Mining(#[from] MineError),
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The local vote ledger: committed chain + pending pool.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Vote>,
}

impl Ledger {
    /// Creates a ledger with a freshly mined genesis block.
    ///
    /// Genesis is mined like any other block, from the seed previous-hash
    /// [`GENESIS_PREVIOUS_HASH`] — a few tens of thousands of digest
    /// trials, so construction is cheap but not instant. Run it off the
    /// async executor if you have one.
    pub fn new() -> Self {
        let mut genesis = Block::candidate(0, Vec::new(), GENESIS_PREVIOUS_HASH.to_string());
        let attempts = miner::mine(&mut genesis, &MineControl::unbounded())
            .expect("an unbounded, uncancellable proof search always succeeds");
        tracing::info!(
            digest = %block_digest(&genesis),
            proof = genesis.proof,
            attempts,
            "genesis block mined"
        );
        Self {
            chain: vec![genesis],
            pending: Vec::new(),
        }
    }

    /// Buffers a vote in the pending pool.
    ///
    /// Identities are recorded verbatim — no validation of any kind.
    /// Returns the index the vote will occupy once committed, i.e. the
    /// index of the next block to be mined.
    pub fn record_vote(&mut self, voter: impl Into<String>, candidate: impl Into<String>) -> u64 {
        self.pending.push(Vote::new(voter, candidate));
        self.chain.len() as u64
    }

    /// Mines the next block with an unbounded proof search.
    ///
    /// See [`mine_block_with`](Self::mine_block_with) for the bounded form.
    pub fn mine_block(&mut self, previous_hash: String) -> Result<Block, LedgerError> {
        self.mine_block_with(previous_hash, &MineControl::unbounded())
    }

    /// Mines the next block: assembles a candidate from the pending pool
    /// and `previous_hash`, runs the proof search under `control`, appends
    /// the proven block, and returns a copy of it.
    ///
    /// The pending pool moves into the candidate before the search and is
    /// left empty on success. On failure (cancelled or capped search) the
    /// votes move back into the pool, preserving their order, and the
    /// chain is untouched.
    pub fn mine_block_with(
        &mut self,
        previous_hash: String,
        control: &MineControl,
    ) -> Result<Block, LedgerError> {
        let votes = std::mem::take(&mut self.pending);
        let mut candidate = Block::candidate(self.chain.len() as u64, votes, previous_hash);

        match miner::mine(&mut candidate, control) {
            Ok(attempts) => {
                tracing::info!(
                    index = candidate.index,
                    votes = candidate.vote_count(),
                    proof = candidate.proof,
                    attempts,
                    "block mined"
                );
                self.chain.push(candidate.clone());
                Ok(candidate)
            }
            Err(e) => {
                // Hand the votes back; nothing was committed.
                self.pending = candidate.votes;
                Err(e.into())
            }
        }
    }

    /// The last block of the chain.
    pub fn current_head(&self) -> Result<&Block, LedgerError> {
        self.chain.last().ok_or(LedgerError::EmptyLedger)
    }

    /// A read-only copy of the full chain, for consensus exchange and
    /// external inspection.
    pub fn snapshot(&self) -> Vec<Block> {
        self.chain.clone()
    }

    /// Number of committed blocks.
    pub fn len(&self) -> u64 {
        self.chain.len() as u64
    }

    /// True when the chain has no blocks. Never the case for a ledger
    /// built via [`Ledger::new`].
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Votes awaiting commitment, in insertion order.
    pub fn pending_votes(&self) -> &[Vote] {
        &self.pending
    }

    /// Wholesale chain replacement, used by consensus resolution after a
    /// longer peer chain has been validated. Clears the pending pool:
    /// whatever the adopted history committed, the old "pending" notion no
    /// longer applies to it.
    pub fn replace_chain(&mut self, chain: Vec<Block>) {
        tracing::info!(
            old_len = self.chain.len(),
            new_len = chain.len(),
            dropped_pending = self.pending.len(),
            "replacing local chain"
        );
        self.chain = chain;
        self.pending.clear();
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DIFFICULTY_PREFIX;
    use crate::validator;

    #[test]
    fn fresh_ledger_has_mined_genesis() {
        let ledger = Ledger::new();
        assert_eq!(ledger.len(), 1);

        let head = ledger.current_head().unwrap();
        assert_eq!(head.index, 0);
        assert_eq!(head.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(head.votes.is_empty());
        assert!(block_digest(head).starts_with(DIFFICULTY_PREFIX));
    }

    #[test]
    fn record_vote_returns_next_block_index() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.record_vote("alice", "bob"), 1);
        assert_eq!(ledger.record_vote("carol", "bob"), 1);
        assert_eq!(ledger.pending_votes().len(), 2);
    }

    #[test]
    fn mine_block_commits_pool_and_clears_it() {
        let mut ledger = Ledger::new();
        ledger.record_vote("alice", "bob");
        ledger.record_vote("carol", "dave");

        let prev = block_digest(ledger.current_head().unwrap());
        let block = ledger.mine_block(prev.clone()).unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, prev);
        assert_eq!(block.vote_count(), 2);
        assert_eq!(block.votes[0], Vote::new("alice", "bob"));
        assert!(ledger.pending_votes().is_empty());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn mined_chain_validates() {
        let mut ledger = Ledger::new();
        for i in 0..3 {
            ledger.record_vote(format!("voter_{i}"), "bob");
            let prev = block_digest(ledger.current_head().unwrap());
            ledger.mine_block(prev).unwrap();
        }
        assert_eq!(ledger.len(), 4);
        assert!(validator::is_valid_chain(&ledger.snapshot()));
    }

    #[test]
    fn failed_search_returns_votes_to_pool() {
        let mut ledger = Ledger::new();
        ledger.record_vote("alice", "bob");
        ledger.record_vote("carol", "dave");

        let prev = block_digest(ledger.current_head().unwrap());
        let result = ledger.mine_block_with(prev, &MineControl::bounded(0));

        assert!(matches!(
            result,
            Err(LedgerError::Mining(MineError::IterationLimitReached { .. }))
        ));
        // Nothing committed, nothing lost, order intact.
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending_votes().len(), 2);
        assert_eq!(ledger.pending_votes()[0], Vote::new("alice", "bob"));
    }

    #[test]
    fn replace_chain_swaps_blocks_and_drops_pending() {
        let mut ledger = Ledger::new();
        ledger.record_vote("alice", "bob");

        let mut other = Ledger::new();
        for _ in 0..2 {
            let prev = block_digest(other.current_head().unwrap());
            other.mine_block(prev).unwrap();
        }

        let adopted = other.snapshot();
        ledger.replace_chain(adopted.clone());

        assert_eq!(ledger.snapshot(), adopted);
        assert!(ledger.pending_votes().is_empty());
    }

    #[test]
    fn snapshot_is_a_copy() {
        let ledger = Ledger::new();
        let mut snap = ledger.snapshot();
        snap.clear();
        assert_eq!(ledger.len(), 1);
    }
}
