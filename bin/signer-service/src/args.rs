//! Parses command-line arguments for the signer CLI.

use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use tricorn_primitives::networks::NetworkType;
use tricorn_signer::KeyUsage;

#[derive(Debug, Parser)]
#[clap(
    name = "signer-service",
    about = "The custodial signer of the bridge",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(
        long,
        short = 'c',
        env = "CONFIG",
        help = "The file containing the configuration for the signer",
        default_value = "config.toml"
    )]
    pub config: PathBuf,

    #[clap(long, env = "RPC_ADDR", help = "Overrides the address the RPC server binds to")]
    pub rpc_addr: Option<String>,

    #[clap(long, env = "DATADIR", help = "Overrides the directory of the keystore")]
    pub datadir: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Command {
    /// Serves signatures until interrupted.
    Run,

    /// Stores a private key, replacing the previous key of the same network type and usage.
    Import {
        #[clap(long, help = "NT_EVM, NT_CASPER or NT_SOLANA")]
        network_type: NetworkType,

        #[clap(long, help = "DT_TRANSACTION or DT_SIGNATURE")]
        usage: KeyUsage,

        #[clap(long, env = "PRIVATE_KEY", help = "The hex encoded private key")]
        private_key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from([
            "signer-service",
            "import",
            "--network-type",
            "NT_CASPER",
            "--usage",
            "DT_SIGNATURE",
            "--private-key",
            "00ff",
        ])
        .expect("must parse");

        match cli.command {
            Command::Import {
                network_type,
                usage,
                private_key,
            } => {
                assert_eq!(network_type, NetworkType::Casper);
                assert_eq!(usage, KeyUsage::Signature);
                assert_eq!(private_key, "00ff");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_usage_is_rejected() {
        let result = Cli::try_parse_from([
            "signer-service",
            "import",
            "--network-type",
            "NT_EVM",
            "--usage",
            "DT_OTHER",
            "--private-key",
            "00",
        ]);

        assert!(result.is_err(), "unknown usages must not reach the keystore");
    }
}
