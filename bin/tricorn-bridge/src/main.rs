//! The tricorn bridge node.
//!
//! Watches the bridge contracts of the configured chains, releases deposited funds on the
//! destination chain and serves the bridge API.

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
mod connectors;
mod constants;
mod node;
mod rpc_server;
mod seed;
mod signer_client;

fn main() {
    let dotenv = dotenvy::dotenv();
    logging::init(LoggerConfig::with_base_name("tricorn-bridge"));
    if let Err(err) = dotenv {
        debug!(%err, "no .env file loaded");
    }

    let cli = args::Cli::parse();
    info!(command = ?cli.command, mode = %cli.communication_mode, "starting tricorn bridge");

    let config = parse_toml::<Config>(&cli.config).with_overrides(&cli);

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .enable_all()
        .build()
        .expect("must be able to create runtime");

    let result = runtime.block_on(async {
        match cli.command {
            Command::Run => node::run(config, cli.communication_mode).await,
            Command::Seed => {
                let db = node::open_db(&config).await?;
                seed::seed(&db).await.map(|_| ())
            }
        }
    });

    if let Err(err) = result {
        error!(?err, "tricorn bridge failed");
        std::process::exit(1);
    }

    info!("tricorn bridge shutdown complete");
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
