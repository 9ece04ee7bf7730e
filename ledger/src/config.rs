//! # Protocol Configuration & Constants
//!
//! Every magic number in TALLY lives here. The difficulty prefix and the
//! genesis seed are consensus-critical: two nodes that disagree on either
//! will never accept each other's chains, so changing them is a hard fork
//! in miniature.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Proof of Work
// ---------------------------------------------------------------------------

/// The difficulty predicate: a block is valid when the hex digest of its
/// canonical serialization starts with this prefix. Four zero nibbles means
/// an expected 16^4 = 65,536 digest trials per block — fast enough to mine
/// in-process on a laptop, slow enough that a block is not free.
pub const DIFFICULTY_PREFIX: &str = "0000";

/// Iteration cap applied to the proof search by the node's request handlers.
/// The expected trial count is ~65k; this cap leaves roughly three orders of
/// magnitude of headroom, so hitting it means the RNG gods truly hate you
/// (p < 10^-300) or the difficulty constant was changed without retuning.
pub const DEFAULT_MAX_PROOF_ITERATIONS: u64 = 100_000_000;

// ---------------------------------------------------------------------------
// Genesis
// ---------------------------------------------------------------------------

/// The `previous_hash` seed for the genesis block. Genesis has no
/// predecessor, so this value is a convention, not a digest. Every TALLY
/// node mines its genesis from this same seed.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default port for the HTTP API (mine / votes / chain / nodes).
pub const DEFAULT_RPC_PORT: u16 = 5000;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 5001;

/// Per-peer timeout for fetching a chain during consensus resolution.
/// One unreachable peer must never stall the whole resolution pass, so
/// this is enforced per request, not per pass.
pub const PEER_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
