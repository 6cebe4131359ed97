//! # CLI Interface
//!
//! Command-line arguments for `snp-node`, built with `clap` derive. Three
//! subcommands: `run`, `config`, and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use snp_engine::config::{DEFAULT_API_PORT, DEFAULT_BLOCK_TIME_MS, DEFAULT_METRICS_PORT};

/// Owner used when neither a deployment file nor `--owner` names one.
pub const DEFAULT_DEVNET_OWNER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";

/// SNP vault node.
///
/// Hosts the conservative, balanced, and growth vaults in one process,
/// serves their read API and a JSON-RPC gateway for authenticated calls,
/// and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "snp-node",
    about = "SNP yield vault node",
    version,
    propagate_version = true
)]
pub struct SnpNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Print the default three-tier deployment as JSON and exit.
    Config(ConfigArgs),
    /// Print version information and exit.
    Version,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable output for local development.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Deployment file (JSON). Defaults to the three observed tiers.
    #[arg(long, short = 'c', env = "SNP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Owner principal for every vault. Overrides the deployment file.
    #[arg(long, env = "SNP_OWNER")]
    pub owner: Option<String>,

    /// Port for the HTTP API and JSON-RPC gateway.
    #[arg(long, env = "SNP_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "SNP_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Interval between simulated blocks, in milliseconds.
    #[arg(long, env = "SNP_BLOCK_TIME_MS", default_value_t = DEFAULT_BLOCK_TIME_MS)]
    pub block_time_ms: u64,

    /// Log output format.
    #[arg(long, env = "SNP_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Expose the `devnet_*` RPC methods, such as wallet funding.
    #[arg(long, env = "SNP_DEVNET")]
    pub devnet: bool,
}

/// Arguments for the `config` subcommand.
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Owner principal written into the generated deployment.
    #[arg(long, default_value = DEFAULT_DEVNET_OWNER)]
    pub owner: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        SnpNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = SnpNodeCli::try_parse_from(["snp-node", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.api_port, DEFAULT_API_PORT);
                assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
                assert_eq!(args.log_format, LogFormatArg::Pretty);
                assert!(args.config.is_none());
                assert!(!args.devnet);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_accepts_json_logs_and_owner() {
        let cli = SnpNodeCli::try_parse_from([
            "snp-node",
            "run",
            "--log-format",
            "json",
            "--owner",
            "ST1ADMIN",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.log_format, LogFormatArg::Json);
        assert_eq!(args.owner.as_deref(), Some("ST1ADMIN"));
    }

    #[test]
    fn devnet_is_opt_in() {
        let cli = SnpNodeCli::try_parse_from(["snp-node", "run", "--devnet"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.devnet);
    }
}
