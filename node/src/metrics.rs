//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `/metrics` on the
//! configured metrics port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] so they do not
//! collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`-backed internally) so it
/// can be shared across request handlers and background tasks.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Height of the local chain (block count).
    pub chain_height: IntGauge,
    /// Votes currently waiting in the pending pool.
    pub pending_votes: IntGauge,
    /// Number of registered peer addresses.
    pub registered_peers: IntGauge,
    /// Total votes accepted through the API.
    pub votes_recorded_total: IntCounter,
    /// Total blocks mined by this node.
    pub blocks_mined_total: IntCounter,
    /// Total consensus resolution rounds run.
    pub resolve_rounds_total: IntCounter,
    /// Total times the local chain was replaced by a peer's.
    pub chain_replacements_total: IntCounter,
    /// Histogram of proof-search wall time in seconds.
    pub mining_duration_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("tally".into()), None)
            .expect("failed to create prometheus registry");

        let chain_height = IntGauge::new("chain_height", "Number of blocks in the local chain")
            .expect("metric creation");
        registry
            .register(Box::new(chain_height.clone()))
            .expect("metric registration");

        let pending_votes = IntGauge::new(
            "pending_votes",
            "Votes recorded but not yet committed to a block",
        )
        .expect("metric creation");
        registry
            .register(Box::new(pending_votes.clone()))
            .expect("metric registration");

        let registered_peers =
            IntGauge::new("registered_peers", "Number of registered peer addresses")
                .expect("metric creation");
        registry
            .register(Box::new(registered_peers.clone()))
            .expect("metric registration");

        let votes_recorded_total =
            IntCounter::new("votes_recorded_total", "Total votes accepted through the API")
                .expect("metric creation");
        registry
            .register(Box::new(votes_recorded_total.clone()))
            .expect("metric registration");

        let blocks_mined_total =
            IntCounter::new("blocks_mined_total", "Total blocks mined by this node")
                .expect("metric creation");
        registry
            .register(Box::new(blocks_mined_total.clone()))
            .expect("metric registration");

        let resolve_rounds_total = IntCounter::new(
            "resolve_rounds_total",
            "Total consensus resolution rounds run",
        )
        .expect("metric creation");
        registry
            .register(Box::new(resolve_rounds_total.clone()))
            .expect("metric registration");

        let chain_replacements_total = IntCounter::new(
            "chain_replacements_total",
            "Total times the local chain was replaced by a peer chain",
        )
        .expect("metric creation");
        registry
            .register(Box::new(chain_replacements_total.clone()))
            .expect("metric registration");

        let mining_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "mining_duration_seconds",
                "Wall time of the proof-of-work search in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(mining_duration_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            chain_height,
            pending_votes,
            registered_peers,
            votes_recorded_total,
            blocks_mined_total,
            resolve_rounds_total,
            chain_replacements_total,
            mining_duration_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
