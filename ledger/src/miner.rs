//! # Proof-of-Work Miner
//!
//! The mining algorithm is an honest brute force: starting from `proof = 0`,
//! digest the candidate, check the difficulty prefix, increment, repeat.
//! SHA-256 behaves uniformly over its output space, so with a 4-nibble
//! prefix the search terminates after ~65k trials in expectation.
//!
//! ## Cancellation and Bounds
//!
//! The search is CPU-bound and, in principle, unbounded. Rather than bake a
//! policy into the algorithm, the caller passes a [`MineControl`]: an
//! optional iteration cap plus a [`CancelToken`] that another thread can
//! trip at any time. The default control is unbounded and uncancellable,
//! which is the behavior a standalone ledger wants; a serving node passes a
//! bounded control so a request handler can enforce timeouts without
//! redesigning the search.
//!
//! The search fully owns the calling thread for its duration — run it on a
//! blocking-work thread, never on an async executor thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::block::Block;
use crate::validator;

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// A cheap, cloneable flag for interrupting an in-flight proof search.
///
/// Clones share the same underlying flag. Cancelling is sticky — there is
/// no reset, by analogy with a request that has already been abandoned.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the flag. Any search polling this token stops at its next
    /// iteration boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// MineControl
// ---------------------------------------------------------------------------

/// Caller-supplied policy for a proof search.
#[derive(Clone, Debug, Default)]
pub struct MineControl {
    /// Maximum number of digest trials before the search gives up.
    /// `None` means search until a proof is found or the token trips.
    pub max_iterations: Option<u64>,

    /// Cooperative cancellation flag, polled once per trial.
    pub cancel: CancelToken,
}

impl MineControl {
    /// No cap, fresh token: the search runs until it succeeds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Caps the search at `max_iterations` digest trials.
    pub fn bounded(max_iterations: u64) -> Self {
        Self {
            max_iterations: Some(max_iterations),
            cancel: CancelToken::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// MineError
// ---------------------------------------------------------------------------

/// Ways a bounded or cancellable search can end without a proof.
///
/// An unbounded search with an untripped token never returns these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MineError {
    /// The [`CancelToken`] was tripped mid-search.
    #[error("proof search cancelled after {attempts} trials")]
    Cancelled {
        /// Digest trials performed before the cancellation was observed.
        attempts: u64,
    },

    /// The iteration cap was exhausted before a valid proof appeared.
    #[error("no valid proof within {limit} trials")]
    IterationLimitReached {
        /// The cap that was hit.
        limit: u64,
    },
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Runs the proof-of-work search over `candidate`, in place.
///
/// Every field except `proof` must be frozen before the call — the miner
/// treats them as read-only and varies only the nonce. On success the
/// candidate's `proof` holds the smallest nonce whose digest satisfies the
/// difficulty predicate, and the number of digest trials is returned. On
/// failure the candidate is left at the last nonce tried, with its votes
/// and linkage intact, so the caller can reclaim them.
///
/// Reproducible: the same candidate fields always yield the same proof.
pub fn mine(candidate: &mut Block, control: &MineControl) -> Result<u64, MineError> {
    candidate.proof = 0;
    let mut attempts: u64 = 0;

    loop {
        if control.cancel.is_cancelled() {
            return Err(MineError::Cancelled { attempts });
        }
        if let Some(limit) = control.max_iterations {
            if attempts >= limit {
                return Err(MineError::IterationLimitReached { limit });
            }
        }

        attempts += 1;
        if validator::is_valid_block(candidate) {
            tracing::debug!(
                index = candidate.index,
                proof = candidate.proof,
                attempts,
                "proof found"
            );
            return Ok(attempts);
        }
        candidate.proof += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
