//! # Longest-Valid-Chain Consensus
//!
//! Conflict resolution is deliberately naive: ask every registered peer
//! for its full chain, validate each one, and adopt the longest valid
//! chain that is *strictly* longer than ours. Ties keep the local chain
//! (first-writer-wins among equals), and the local chain never shrinks.
//!
//! Chain length is always measured by counting the blocks we actually
//! parsed. Peers transmit a `length` field alongside their chain, and we
//! echo one in our own responses, but an attacker-controlled counter is
//! not evidence — it is never used in any comparison.
//!
//! ## Lock discipline
//!
//! Resolution holds no ledger lock while talking to the network. The
//! local length is sampled once up front for candidate filtering, and
//! re-checked under the write lock at swap time, so a block mined during
//! a slow peer fetch cannot be clobbered by a chain that was only longer
//! than the *old* local chain.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::Block;
use crate::config::PEER_FETCH_TIMEOUT;
use crate::ledger::Ledger;
use crate::registry::NodeRegistry;
use crate::validator;

// ---------------------------------------------------------------------------
// Wire document
// ---------------------------------------------------------------------------

/// The chain-exchange payload: a full chain plus the sender's block count.
///
/// `length` is advisory. Consumers must count `chain` themselves.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainDocument {
    /// The sender's full chain, genesis first.
    pub chain: Vec<Block>,
    /// The sender's claimed block count. Informational only.
    pub length: u64,
}

impl ChainDocument {
    /// Wraps a chain with its actual block count.
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len() as u64;
        Self { chain, length }
    }
}

// ---------------------------------------------------------------------------
// PeerError
// ---------------------------------------------------------------------------

/// Ways a single peer fetch can fail. Failures are per-peer and never
/// abort a resolution round.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The peer was unreachable or too slow.
    #[error("peer {address} unreachable: {reason}")]
    Unreachable {
        /// Canonical `host:port` of the peer.
        address: String,
        /// Transport-level detail for the log line.
        reason: String,
    },

    /// The peer responded, but not with a parseable chain document.
    #[error("peer {address} sent a malformed chain document: {reason}")]
    MalformedResponse {
        /// Canonical `host:port` of the peer.
        address: String,
        /// Decode-level detail for the log line.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// PeerClient
// ---------------------------------------------------------------------------

/// Transport abstraction for fetching a peer's chain.
///
/// The resolver depends on this trait rather than on a concrete HTTP
/// client, which keeps consensus logic testable with scripted peers.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Fetches the full chain document from the peer at `address`
    /// (canonical `host:port`).
    async fn fetch_chain(&self, address: &str) -> Result<ChainDocument, PeerError>;
}

/// HTTP peer client: `GET http://{address}/chain` with a per-peer timeout.
pub struct HttpPeerClient {
    http: reqwest::Client,
}

impl HttpPeerClient {
    /// Builds a client with the default per-peer timeout.
    ///
    /// `reqwest::Client` construction only fails on TLS-backend or system
    /// configuration problems, which are fatal at startup anyway.
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(PEER_FETCH_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, address: &str) -> Result<ChainDocument, PeerError> {
        let url = format!("http://{address}/chain");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PeerError::Unreachable {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        response
            .json::<ChainDocument>()
            .await
            .map_err(|e| PeerError::MalformedResponse {
                address: address.to_string(),
                reason: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of one resolution round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveReport {
    /// Whether the local chain was replaced.
    pub replaced: bool,
    /// Local chain length after the round.
    pub chain_length: u64,
    /// Peers that were asked.
    pub peers_queried: usize,
    /// Peers that could not be fetched or decoded.
    pub peers_failed: usize,
    /// Peers whose chains failed validation.
    pub peers_invalid: usize,
}

/// Runs longest-valid-chain resolution against a peer set.
pub struct ConsensusResolver {
    ledger: Arc<RwLock<Ledger>>,
    registry: Arc<NodeRegistry>,
    client: Arc<dyn PeerClient>,
}

impl ConsensusResolver {
    /// Wires the resolver to its ledger, peer set, and transport.
    pub fn new(
        ledger: Arc<RwLock<Ledger>>,
        registry: Arc<NodeRegistry>,
        client: Arc<dyn PeerClient>,
    ) -> Self {
        Self {
            ledger,
            registry,
            client,
        }
    }

    /// One full resolution round: query every registered peer, keep the
    /// longest valid strictly-longer chain seen, and swap it in.
    ///
    /// Never returns an error — peer failures are tolerated, logged, and
    /// tallied in the report. With no peers registered this is a no-op.
    pub async fn resolve(&self) -> ResolveReport {
        let local_len = self.ledger.read().len();
        let peers = self.registry.list();

        let mut report = ResolveReport {
            replaced: false,
            chain_length: local_len,
            peers_queried: peers.len(),
            peers_failed: 0,
            peers_invalid: 0,
        };

        let mut best: Option<Vec<Block>> = None;
        let mut best_len = local_len;

        for address in &peers {
            let document = match self.client.fetch_chain(address).await {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(peer = %address, error = %e, "peer fetch failed");
                    report.peers_failed += 1;
                    continue;
                }
            };

            let parsed_len = document.chain.len() as u64;
            if document.length != parsed_len {
                tracing::warn!(
                    peer = %address,
                    claimed = document.length,
                    actual = parsed_len,
                    "peer length claim disagrees with its chain"
                );
            }

            // Strictly longer than the best so far, or it cannot win.
            if parsed_len <= best_len {
                continue;
            }
            if !validator::is_valid_chain(&document.chain) {
                tracing::warn!(peer = %address, length = parsed_len, "peer chain invalid");
                report.peers_invalid += 1;
                continue;
            }

            best_len = parsed_len;
            best = Some(document.chain);
        }

        if let Some(chain) = best {
            let mut ledger = self.ledger.write();
            // The local chain may have grown while we were fetching;
            // only swap if the candidate still wins.
            if best_len > ledger.len() {
                ledger.replace_chain(chain);
                report.replaced = true;
            }
            report.chain_length = ledger.len();
        } else {
            report.chain_length = self.ledger.read().len();
        }

        tracing::info!(
            replaced = report.replaced,
            chain_length = report.chain_length,
            peers_queried = report.peers_queried,
            peers_failed = report.peers_failed,
            peers_invalid = report.peers_invalid,
            "consensus round complete"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::block_digest;
    use std::collections::HashMap;

    /// Scripted peer transport: a fixed response per address.
    struct ScriptedPeers {
        responses: HashMap<String, ChainDocument>,
    }

    impl ScriptedPeers {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
            }
        }

        fn respond(mut self, address: &str, document: ChainDocument) -> Self {
            self.responses.insert(address.to_string(), document);
            self
        }
    }

    #[async_trait]
    impl PeerClient for ScriptedPeers {
        async fn fetch_chain(&self, address: &str) -> Result<ChainDocument, PeerError> {
            self.responses
                .get(address)
                .cloned()
                .ok_or_else(|| PeerError::Unreachable {
                    address: address.to_string(),
                    reason: "no scripted response".to_string(),
                })
        }
    }

    fn extend(ledger: &mut Ledger, blocks: usize) {
        for _ in 0..blocks {
            let prev = block_digest(ledger.current_head().unwrap());
            ledger.mine_block(prev).unwrap();
        }
    }

    fn resolver_with(
        ledger: Ledger,
        peers: &[&str],
        client: ScriptedPeers,
    ) -> (Arc<RwLock<Ledger>>, ConsensusResolver) {
        let ledger = Arc::new(RwLock::new(ledger));
        let registry = Arc::new(NodeRegistry::new());
        for peer in peers {
            registry.register(peer).unwrap();
        }
        let resolver = ConsensusResolver::new(Arc::clone(&ledger), registry, Arc::new(client));
        (ledger, resolver)
    }

    #[tokio::test]
    async fn no_peers_is_a_noop() {
        let (ledger, resolver) = resolver_with(Ledger::new(), &[], ScriptedPeers::new());
        let report = resolver.resolve().await;

        assert!(!report.replaced);
        assert_eq!(report.peers_queried, 0);
        assert_eq!(ledger.read().len(), 1);
    }

    #[tokio::test]
    async fn adopts_a_longer_valid_chain() {
        let mut remote = Ledger::new();
        extend(&mut remote, 3);
        let remote_chain = remote.snapshot();

        let client = ScriptedPeers::new()
            .respond("peer.example:5000", ChainDocument::new(remote_chain.clone()));
        let (ledger, resolver) = resolver_with(Ledger::new(), &["peer.example:5000"], client);

        let report = resolver.resolve().await;
        assert!(report.replaced);
        assert_eq!(report.chain_length, 4);
        assert_eq!(ledger.read().snapshot(), remote_chain);
    }

    #[tokio::test]
    async fn rejects_a_longer_but_tampered_chain() {
        let mut remote = Ledger::new();
        extend(&mut remote, 3);
        let mut tampered = remote.snapshot();
        tampered[2].previous_hash = "f".repeat(64);

        let client =
            ScriptedPeers::new().respond("peer.example:5000", ChainDocument::new(tampered));
        let (ledger, resolver) = resolver_with(Ledger::new(), &["peer.example:5000"], client);

        let report = resolver.resolve().await;
        assert!(!report.replaced);
        assert_eq!(report.peers_invalid, 1);
        assert_eq!(ledger.read().len(), 1);
    }

    #[tokio::test]
    async fn equal_length_keeps_the_local_chain() {
        let mut local = Ledger::new();
        extend(&mut local, 2);
        let local_chain = local.snapshot();

        let mut remote = Ledger::new();
        extend(&mut remote, 2);

        let client =
            ScriptedPeers::new().respond("peer.example:5000", ChainDocument::new(remote.snapshot()));
        let (ledger, resolver) = resolver_with(local, &["peer.example:5000"], client);

        let report = resolver.resolve().await;
        assert!(!report.replaced);
        assert_eq!(ledger.read().snapshot(), local_chain);
    }

    #[tokio::test]
    async fn inflated_length_claim_is_ignored() {
        // A peer claims a huge length but ships a short chain. The parsed
        // block count is what competes, so nothing is adopted.
        let remote = Ledger::new();
        let mut document = ChainDocument::new(remote.snapshot());
        document.length = 1_000_000;

        let mut local = Ledger::new();
        extend(&mut local, 1);

        let client = ScriptedPeers::new().respond("peer.example:5000", document);
        let (ledger, resolver) = resolver_with(local, &["peer.example:5000"], client);

        let report = resolver.resolve().await;
        assert!(!report.replaced);
        assert_eq!(ledger.read().len(), 2);
    }

    #[tokio::test]
    async fn unreachable_peers_are_tolerated() {
        let mut remote = Ledger::new();
        extend(&mut remote, 2);

        let client = ScriptedPeers::new()
            .respond("up.example:5000", ChainDocument::new(remote.snapshot()));
        let (ledger, resolver) = resolver_with(
            Ledger::new(),
            &["up.example:5000", "down.example:5000"],
            client,
        );

        let report = resolver.resolve().await;
        assert!(report.replaced);
        assert_eq!(report.peers_failed, 1);
        assert_eq!(ledger.read().len(), 3);
    }

    #[tokio::test]
    async fn longest_of_several_valid_chains_wins() {
        let mut shorter = Ledger::new();
        extend(&mut shorter, 1);
        let mut longer = Ledger::new();
        extend(&mut longer, 3);
        let longest_chain = longer.snapshot();

        let client = ScriptedPeers::new()
            .respond("a.example:5000", ChainDocument::new(shorter.snapshot()))
            .respond("b.example:5000", ChainDocument::new(longest_chain.clone()));
        let (ledger, resolver) = resolver_with(
            Ledger::new(),
            &["a.example:5000", "b.example:5000"],
            client,
        );

        let report = resolver.resolve().await;
        assert!(report.replaced);
        assert_eq!(ledger.read().snapshot(), longest_chain);
    }
}
