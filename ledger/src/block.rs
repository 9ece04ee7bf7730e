//! # Block Structure
//!
//! A block is the unit of commitment in TALLY. Each block carries an ordered
//! batch of votes, a link to its predecessor's digest, and a proof-of-work
//! nonce that makes the block expensive to forge.
//!
//! ## Wire Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Block                                       │
//! │  ├── index: u64          (position, 0-based) │
//! │  ├── timestamp: u64      (ms since epoch)    │
//! │  ├── votes: Vec<Vote>    (insertion order)   │
//! │  ├── previous_hash: String  (hex digest)     │
//! │  └── proof: u64          (PoW nonce)         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The JSON keys `index, timestamp, votes, previous_hash, proof` (and
//! `from, to` inside each vote) are the peer-exchange wire format AND the
//! hashing preimage — see [`crate::hash`] for the canonicalization rule.
//!
//! ## Immutability
//!
//! Once appended to a ledger, a block is never mutated. The only mutable
//! phase of a block's life is the candidate phase, while the miner is still
//! searching for its proof.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vote
// ---------------------------------------------------------------------------

/// A single vote: one opaque identity endorsing another.
///
/// Identities are free-form string tokens — TALLY does not validate their
/// existence, uniqueness, or spelling. `from`/`to` are the wire names;
/// `from` is a Rust keyword, hence the renames.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Identity casting the vote.
    #[serde(rename = "from")]
    pub voter: String,
    /// Identity the vote is for.
    #[serde(rename = "to")]
    pub candidate: String,
}

impl Vote {
    /// Builds a vote from two identity tokens.
    pub fn new(voter: impl Into<String>, candidate: impl Into<String>) -> Self {
        Self {
            voter: voter.into(),
            candidate: candidate.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A block in the vote ledger.
///
/// Invariants once appended to a [`crate::ledger::Ledger`]:
///
/// - `index` equals the block's position in the chain (0 for genesis).
/// - `previous_hash` equals the digest of the predecessor block, except for
///   genesis, where it is the seed [`crate::config::GENESIS_PREVIOUS_HASH`].
/// - the block's own digest starts with
///   [`crate::config::DIFFICULTY_PREFIX`].
///
/// `proof` is a search result, not a free field: re-running the miner over
/// the same candidate fields reproduces the same value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the ledger, 0-based.
    pub index: u64,
    /// Wall-clock creation time in milliseconds since the UNIX epoch.
    /// Fixed when the candidate is assembled, before the proof search.
    pub timestamp: u64,
    /// Votes committed by this block, in the order they were recorded.
    pub votes: Vec<Vote>,
    /// Hex digest of the predecessor block (or the genesis seed).
    pub previous_hash: String,
    /// Proof-of-work nonce.
    pub proof: u64,
}

impl Block {
    /// Assembles a candidate block ready for the proof search.
    ///
    /// The timestamp is sampled here and frozen — mutating any field other
    /// than `proof` after this point would invalidate in-flight proof
    /// guesses, so the miner receives the candidate with everything else
    /// already fixed. `proof` starts at 0.
    pub fn candidate(index: u64, votes: Vec<Vote>, previous_hash: String) -> Self {
        Self {
            index,
            timestamp: now_millis(),
            votes,
            previous_hash,
            proof: 0,
        }
    }

    /// Number of votes committed by this block.
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
