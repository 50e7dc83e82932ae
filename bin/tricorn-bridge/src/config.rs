use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use tricorn_connectors::{casper::config::CasperConfig, evm::config::EvmConfig};
use tricorn_currency_rates::CurrencyRatesConfig;
use tricorn_db::persistent::config::DbConfig;

use crate::{
    args::Cli,
    constants::{DEFAULT_RECONNECT_INTERVAL, DEFAULT_SIGNER_TIMEOUT},
};

/// The configuration values that dictate the behavior of the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The directory to store the database in.
    pub datadir: PathBuf,

    /// The RPC server addr for the bridge.
    pub rpc_addr: String,

    /// Worker threads of the runtime.
    #[serde(default)]
    pub num_threads: Option<u8>,

    /// Seconds between two attempts to bring disconnected chains back.
    #[serde(default)]
    pub reconnect_interval: Option<u64>,

    /// The configuration for the sqlite3 database.
    #[serde(default)]
    pub db: DbConfig,

    /// How to reach the signer.
    pub signer: SignerClientConfig,

    /// EVM chains to connect to.
    #[serde(default)]
    pub evm: Vec<EvmConfig>,

    /// Casper chains to connect to.
    #[serde(default)]
    pub casper: Vec<CasperConfig>,

    /// Price ticker, disabled when absent.
    #[serde(default)]
    pub currency_rates: Option<CurrencyRatesConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SignerClientConfig {
    /// URL of the signer's RPC server.
    pub url: String,

    /// The timeout for requests, in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl SignerClientConfig {
    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SIGNER_TIMEOUT)
    }
}

impl Config {
    /// Applies the overrides given on the command line or in the environment.
    pub(crate) fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(rpc_addr) = &cli.rpc_addr {
            self.rpc_addr = rpc_addr.clone();
        }
        if let Some(datadir) = &cli.datadir {
            self.datadir = datadir.clone();
        }
        if let Some(url) = &cli.signer_url {
            self.signer.url = url.clone();
        }
        if let Some(base_url) = &cli.currency_rate_base_url {
            self.currency_rates = Some(
                self.currency_rates
                    .take()
                    .unwrap_or_default()
                    .with_base_url(base_url.clone()),
            );
        }

        self
    }

    pub(crate) fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RECONNECT_INTERVAL)
    }
}
