//! # CLI Interface
//!
//! Command-line argument structure for `tally-node`, via `clap` derive.
//! Two subcommands: `run` and `version`.

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// TALLY vote-ledger node.
///
/// A single node of the TALLY network: records votes, mines proof-of-work
/// blocks that commit them, serves the HTTP API, and reconciles its chain
/// with registered peers by longest-valid-chain consensus.
#[derive(Parser, Debug)]
#[command(
    name = "tally-node",
    about = "TALLY vote-ledger node",
    version,
    propagate_version = true
)]
pub struct TallyNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the TALLY node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the HTTP API.
    #[arg(
        long,
        env = "TALLY_RPC_PORT",
        default_value_t = tally_ledger::config::DEFAULT_RPC_PORT
    )]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(
        long,
        env = "TALLY_METRICS_PORT",
        default_value_t = tally_ledger::config::DEFAULT_METRICS_PORT
    )]
    pub metrics_port: u16,

    /// Comma-separated peer addresses to register at startup,
    /// e.g. `10.0.0.7:5000,10.0.0.8:5000`.
    #[arg(long, env = "TALLY_PEERS")]
    pub peers: Option<String>,

    /// Cap on proof-search iterations for API-triggered mining. The search
    /// gives up (HTTP 503) rather than hold a request open forever.
    #[arg(
        long,
        env = "TALLY_MAX_PROOF_ITERATIONS",
        default_value_t = tally_ledger::config::DEFAULT_MAX_PROOF_ITERATIONS
    )]
    pub max_proof_iterations: u64,

    /// Log output format.
    #[arg(long, env = "TALLY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        TallyNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults_match_protocol_config() {
        let cli = TallyNodeCli::parse_from(["tally-node", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.rpc_port, tally_ledger::config::DEFAULT_RPC_PORT);
        assert_eq!(args.metrics_port, tally_ledger::config::DEFAULT_METRICS_PORT);
        assert!(args.peers.is_none());
    }
}
