// Copyright (c) 2026 Tally Labs. MIT License.
// See LICENSE for details.

//! # TALLY Ledger — Core Library
//!
//! TALLY is a deliberately small proof-of-work ledger for vote records:
//! every transaction is a `{from, to}` pair, every block commits a batch of
//! them, and independent nodes reconcile divergent histories by adopting
//! the longest chain that validates end to end. No staking, no signatures,
//! no fork-choice-by-work — chain length is the whole consensus story.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the moving parts of a node:
//!
//! - **config** — Protocol constants. Difficulty, seeds, ports, timeouts.
//! - **block** — The `Vote` and `Block` data model and its wire shape.
//! - **hash** — Canonical serialization and SHA-256 block digests.
//! - **miner** — The proof-of-work search, cancellable and optionally bounded.
//! - **validator** — Single-block and whole-chain integrity checks.
//! - **ledger** — The chain itself plus the pending-vote pool.
//! - **registry** — The set of known peer addresses.
//! - **consensus** — Peer chain fetching and longest-valid-chain resolution.
//!
//! ## Design Philosophy
//!
//! 1. One canonical byte representation per block. Hashing anything else
//!    breaks every peer's validation, so there is exactly one code path.
//! 2. The ledger is a value, not a service. Locking, scheduling, and I/O
//!    belong to the caller; this crate stays synchronous except where the
//!    network forces its hand (peer fetches).
//! 3. A misbehaving peer can waste our time, never our chain. Every remote
//!    input is re-validated before it displaces local state.

pub mod block;
pub mod config;
pub mod consensus;
pub mod hash;
pub mod ledger;
pub mod miner;
pub mod registry;
pub mod validator;
