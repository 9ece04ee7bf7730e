//! # HTTP API
//!
//! Builds the axum router that exposes the node's HTTP interface. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                         |
//! |--------|--------------------------|-------------------------------------|
//! | GET    | `/health`                | Liveness probe                      |
//! | GET    | `/mine`                  | Mine the pending pool into a block  |
//! | GET    | `/votes/new?from=&to=`   | Record a vote                       |
//! | GET    | `/chain`                 | Full chain + length                 |
//! | GET    | `/nodes/register?nodes=` | Register peer addresses             |
//! | GET    | `/nodes/resolve`         | Run longest-valid-chain resolution  |
//!
//! Everything is GET — the transport mirrors what TALLY peers and scripts
//! already speak, and `/chain` doubles as the peer-exchange endpoint that
//! `HttpPeerClient` consumes on the other side.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tally_ledger::block::Vote;
use tally_ledger::consensus::{ChainDocument, ConsensusResolver};
use tally_ledger::hash::block_digest;
use tally_ledger::ledger::{Ledger, LedgerError};
use tally_ledger::miner::MineControl;
use tally_ledger::registry::NodeRegistry;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc` (or `Arc`-backed).
#[derive(Clone)]
pub struct AppState {
    /// Per-process node identifier, reported by `/health`.
    pub node_id: String,
    /// The node's software version string.
    pub version: String,
    /// The local ledger. Write lock for votes, mining, and chain swaps;
    /// read lock for snapshots.
    pub ledger: Arc<RwLock<Ledger>>,
    /// Registered peer addresses.
    pub registry: Arc<NodeRegistry>,
    /// Consensus resolution against the registered peers.
    pub resolver: Arc<ConsensusResolver>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Mining policy for API-triggered proof searches. The cancel token
    /// is tripped on shutdown so no search outlives the process's will.
    pub mine_control: MineControl,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/mine", get(mine_handler))
        .route("/votes/new", get(new_vote_handler))
        .route("/chain", get(chain_handler))
        .route("/nodes/register", get(register_nodes_handler))
        .route("/nodes/resolve", get(resolve_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /votes/new`.
///
/// Both are required; they are optional here only so the handler can
/// answer a missing parameter with a JSON error body instead of axum's
/// default rejection.
#[derive(Debug, Deserialize)]
pub struct NewVoteParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Query parameters for `GET /nodes/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterParams {
    /// Comma-separated peer addresses.
    pub nodes: Option<String>,
}

/// Response payload for `GET /votes/new`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub message: String,
    /// Index of the block the vote will be committed into.
    pub index: u64,
}

/// Response payload for `GET /mine`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub votes: Vec<Vote>,
    pub proof: u64,
    pub previous_hash: String,
}

/// Response payload for `GET /nodes/register`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    /// Every registered peer after this request, canonical form, sorted.
    pub total_nodes: Vec<String>,
    /// Addresses from this request that failed to parse.
    pub rejected: Vec<String>,
}

/// Response payload for `GET /nodes/resolve`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub message: String,
    pub replaced: bool,
    /// Local chain length after the round.
    pub length: u64,
}

/// Generic error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — liveness probe for orchestrators.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "node_id": state.node_id,
            "version": state.version,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// `GET /mine` — commits the pending pool into a new proven block.
///
/// The proof search is CPU-bound (tens of thousands of digests), so it
/// runs on a blocking-work thread; the write lock travels with it, which
/// serializes mining against votes and chain swaps without ever holding
/// the lock across an await point on the executor.
async fn mine_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = Arc::clone(&state.ledger);
    let control = state.mine_control.clone();
    let started = Instant::now();

    let mined = tokio::task::spawn_blocking(move || {
        let mut guard = ledger.write();
        let previous_hash = block_digest(guard.current_head()?);
        guard.mine_block_with(previous_hash, &control)
    })
    .await;

    match mined {
        Ok(Ok(block)) => {
            state
                .metrics
                .mining_duration_seconds
                .observe(started.elapsed().as_secs_f64());
            state.metrics.blocks_mined_total.inc();
            {
                let guard = state.ledger.read();
                state.metrics.chain_height.set(guard.len() as i64);
                state
                    .metrics
                    .pending_votes
                    .set(guard.pending_votes().len() as i64);
            }

            let resp = MineResponse {
                message: "New Block Forged".into(),
                index: block.index,
                votes: block.votes,
                proof: block.proof,
                previous_hash: block.previous_hash,
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Ok(Err(e @ LedgerError::Mining(_))) => {
            // The bounded search gave up; the votes are back in the pool.
            tracing::warn!(error = %e, "mining request did not produce a block");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "mining request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "mining task panicked or was aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "mining task failed".into(),
                }),
            )
                .into_response()
        }
    }
}

/// `GET /votes/new?from=&to=` — records a vote into the pending pool.
///
/// Identities are opaque strings and are accepted verbatim; only a missing
/// parameter is an error.
async fn new_vote_handler(
    State(state): State<AppState>,
    Query(params): Query<NewVoteParams>,
) -> impl IntoResponse {
    let (Some(from), Some(to)) = (params.from, params.to) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "missing query parameters: both `from` and `to` are required".into(),
            }),
        )
            .into_response();
    };

    let (index, pending) = {
        let mut guard = state.ledger.write();
        let index = guard.record_vote(from, to);
        (index, guard.pending_votes().len())
    };
    state.metrics.votes_recorded_total.inc();
    state.metrics.pending_votes.set(pending as i64);

    (
        StatusCode::CREATED,
        Json(VoteResponse {
            message: format!("Vote will be added to Block {index}"),
            index,
        }),
    )
        .into_response()
}

/// `GET /chain` — the full local chain plus its length.
///
/// This is the same document `HttpPeerClient` fetches from peers during
/// resolution; serving and consuming share one wire shape.
async fn chain_handler(State(state): State<AppState>) -> impl IntoResponse {
    let document = {
        let guard = state.ledger.read();
        ChainDocument::new(guard.snapshot())
    };
    state.metrics.chain_height.set(document.length as i64);
    Json(document)
}

/// `GET /nodes/register?nodes=a,b,...` — registers peer addresses.
///
/// Each address stands alone: a malformed entry is reported back in
/// `rejected` without failing the rest of the batch.
async fn register_nodes_handler(
    State(state): State<AppState>,
    Query(params): Query<RegisterParams>,
) -> impl IntoResponse {
    let Some(nodes) = params.nodes.filter(|n| !n.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "missing query parameter: `nodes` (comma-separated addresses)".into(),
            }),
        )
            .into_response();
    };

    let mut rejected = Vec::new();
    for raw in nodes.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if let Err(e) = state.registry.register(raw) {
            tracing::warn!(address = raw, error = %e, "peer registration rejected");
            rejected.push(raw.to_string());
        }
    }
    state.metrics.registered_peers.set(state.registry.len() as i64);

    (
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "New nodes have been added".into(),
            total_nodes: state.registry.list(),
            rejected,
        }),
    )
        .into_response()
}

/// `GET /nodes/resolve` — one longest-valid-chain resolution round.
async fn resolve_handler(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.resolver.resolve().await;

    state.metrics.resolve_rounds_total.inc();
    if report.replaced {
        state.metrics.chain_replacements_total.inc();
    }
    state.metrics.chain_height.set(report.chain_length as i64);

    let message = if report.replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    Json(ResolveResponse {
        message: message.into(),
        replaced: report.replaced,
        length: report.chain_length,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
