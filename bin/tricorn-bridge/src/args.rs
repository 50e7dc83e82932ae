//! Parses command-line arguments for the bridge CLI.

use std::{convert::Infallible, fmt::Display, path::PathBuf};

use clap::{crate_version, Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(
    name = "tricorn-bridge",
    about = "The cross-chain token bridge",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(
        long,
        short = 'c',
        env = "CONFIG",
        help = "The file containing the configuration for the bridge",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    #[clap(
        long,
        env = "COMMUNICATION_MODE",
        help = "How the bridge reaches the signer: `rpc`, anything else signs in-process",
        value_parser = parse_communication_mode,
        default_value_t = CommunicationMode::Rpc
    )]
    pub communication_mode: CommunicationMode,

    #[clap(long, env = "RPC_ADDR", help = "Overrides the address the RPC server binds to")]
    pub rpc_addr: Option<String>,

    #[clap(long, env = "DATADIR", help = "Overrides the directory of the database")]
    pub datadir: Option<PathBuf>,

    #[clap(
        long,
        env = "SIGNER_SERVER_ADDRESS",
        help = "Overrides the URL of the signer"
    )]
    pub signer_url: Option<String>,

    #[clap(
        long,
        env = "CURRENCY_RATE_BASE_URL",
        help = "Overrides the price endpoint of the currency rate ticker"
    )]
    pub currency_rate_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub(crate) enum Command {
    /// Runs the bridge until interrupted.
    Run,

    /// Inserts the fixture token rows into the database.
    Seed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommunicationMode {
    /// Talk to the signer over JSON-RPC.
    Rpc,

    /// Sign in-process with throwaway keys.
    Mock,
}

fn parse_communication_mode(s: &str) -> Result<CommunicationMode, Infallible> {
    Ok(match s {
        "rpc" => CommunicationMode::Rpc,
        _ => CommunicationMode::Mock,
    })
}

impl Display for CommunicationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommunicationMode::Rpc => write!(f, "rpc"),
            CommunicationMode::Mock => write!(f, "mock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["tricorn-bridge", "--config", "bridge.toml", "run"])
            .expect("must parse");

        assert!(matches!(cli.command, Command::Run));
        assert_eq!(cli.config, PathBuf::from("bridge.toml"));
    }

    #[test]
    fn test_unknown_communication_mode_is_mock() {
        let cli = Cli::try_parse_from(["tricorn-bridge", "--communication-mode", "grpc", "seed"])
            .expect("must parse");
        assert_eq!(cli.communication_mode, CommunicationMode::Mock);

        let cli = Cli::try_parse_from(["tricorn-bridge", "--communication-mode", "rpc", "seed"])
            .expect("must parse");
        assert_eq!(cli.communication_mode, CommunicationMode::Rpc);
    }
}
