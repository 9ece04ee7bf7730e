//! # Peer Registry
//!
//! The set of peer node addresses this node consults during consensus
//! resolution. Registration is explicit (an operator or a peer announces
//! an address), idempotent, and permanent — there is no eviction, health
//! scoring, or gossip. Unreachable peers cost a timeout at resolution
//! time and nothing else.
//!
//! Addresses are canonicalized to bare `host:port` on the way in, so
//! `http://10.0.0.7:5000`, `10.0.0.7:5000`, and `10.0.0.7:5000/` all
//! collapse to one entry.

use dashmap::DashSet;
use thiserror::Error;

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Errors from peer registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The address could not be reduced to a `host:port` pair.
    #[error("malformed peer address: {given}")]
    MalformedAddress {
        /// The address as the caller supplied it.
        given: String,
    },
}

// ---------------------------------------------------------------------------
// Address canonicalization
// ---------------------------------------------------------------------------

/// Reduces a peer address to canonical `host:port` form.
///
/// Accepts an optional `http://` or `https://` scheme and an optional
/// trailing path, both of which are stripped. Rejects anything without a
/// non-empty host and a numeric port.
pub fn canonicalize_address(address: &str) -> Result<String, RegistryError> {
    let malformed = || RegistryError::MalformedAddress {
        given: address.to_string(),
    };

    let trimmed = address.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);

    // Anything from the first slash onward is path, dropped.
    let authority = match without_scheme.find('/') {
        Some(pos) => &without_scheme[..pos],
        None => without_scheme,
    };

    let (host, port) = authority.rsplit_once(':').ok_or_else(malformed)?;
    if host.is_empty() || port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    port.parse::<u16>().map_err(|_| malformed())?;

    Ok(format!("{host}:{port}"))
}

// ---------------------------------------------------------------------------
// NodeRegistry
// ---------------------------------------------------------------------------

/// Concurrent set of known peer addresses, canonical `host:port` form.
///
/// Shared freely across request handlers; all methods take `&self`.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    peers: DashSet<String>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a peer address. Idempotent: re-registering an address
    /// that canonicalizes to an existing entry is a no-op.
    ///
    /// Returns the canonical form of the address.
    pub fn register(&self, address: &str) -> Result<String, RegistryError> {
        let canonical = canonicalize_address(address)?;
        if self.peers.insert(canonical.clone()) {
            tracing::info!(peer = %canonical, "peer registered");
        }
        Ok(canonical)
    }

    /// All registered peers, sorted for stable output.
    pub fn list(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.peers.iter().map(|p| p.key().clone()).collect();
        peers.sort();
        peers
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// True when no peers are registered.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
