//! The custodial signer of the tricorn bridge.
//!
//! Holds one private key per network type and usage and serves signatures over JSON-RPC.

use std::{fs, path::Path};

use args::Command;
use clap::Parser;
use config::Config;
use constants::DEFAULT_THREAD_COUNT;
use serde::de::DeserializeOwned;
use tokio::runtime;
use tracing::{debug, error, info, trace};
use tricorn_common::logging::{self, LoggerConfig};

mod args;
mod config;
mod constants;
mod node;
mod rpc_server;

fn main() {
    let dotenv = dotenvy::dotenv();
    logging::init(LoggerConfig::with_base_name("signer-service"));
    if let Err(err) = dotenv {
        debug!(%err, "no .env file loaded");
    }

    let cli = args::Cli::parse();
    info!("starting signer");

    let mut config = parse_toml::<Config>(&cli.config);
    if let Some(rpc_addr) = cli.rpc_addr {
        config.rpc_addr = rpc_addr;
    }
    if let Some(datadir) = cli.datadir {
        config.datadir = datadir;
    }

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .enable_all()
        .build()
        .expect("must be able to create runtime");

    let result = runtime.block_on(async {
        match cli.command {
            Command::Run => node::run(config).await,
            Command::Import {
                network_type,
                usage,
                private_key,
            } => {
                let pool = node::open_keystore(&config).await?;
                if let Some(public_key) =
                    node::import(pool, network_type, usage, &private_key).await?
                {
                    info!(%public_key, "public key of the imported key");
                }
                Ok(())
            }
        }
    });

    if let Err(err) = result {
        error!(?err, "signer failed");
        std::process::exit(1);
    }

    info!("signer shutdown complete");
}

/// Reads and parses a TOML file from the given path into the given type `T`.
///
/// # Panics
///
/// 1. If the file is not readable.
/// 2. If the contents of the file cannot be deserialized into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> T
where
    T: std::fmt::Debug + DeserializeOwned,
{
    fs::read_to_string(path)
        .map(|p| {
            trace!(?p, "read file");

            let parsed = toml::from_str::<T>(&p).unwrap_or_else(|e| {
                panic!("failed to parse TOML file: {e:?}");
            });
            debug!(?parsed, "parsed TOML file");

            parsed
        })
        .unwrap_or_else(|e| {
            panic!("failed to read TOML file: {e}");
        })
}
