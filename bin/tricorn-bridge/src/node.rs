//! Wires the bridge together and runs it until shutdown.

use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use rand::Rng;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tricorn_common::peer::{cancel_on_signal, Communication, Peer};
use tricorn_currency_rates::{CurrencyRatesConfig, HttpCurrencyRates, PriceTicker};
use tricorn_db::persistent::sqlite::SqliteDb;
use tricorn_orchestrator::Bridge;
use tricorn_primitives::networks::NetworkType;
use tricorn_rpc::{traits::BridgeApiServer, RpcServer};
use tricorn_signer::{BridgeSigner, InMemoryKeyStore, KeyUsage, SignerService};

use crate::{
    args::CommunicationMode,
    config::Config,
    connectors::{ChainConfig, ConnectorSupervisor},
    constants::DB_NAME,
    rpc_server::BridgeRpc,
    signer_client::SignerRpcClient,
};

/// Opens the database in the data directory, creating and migrating it as needed.
pub(crate) async fn open_db(config: &Config) -> anyhow::Result<SqliteDb> {
    tokio::fs::create_dir_all(&config.datadir)
        .await
        .with_context(|| format!("create data directory {}", config.datadir.display()))?;

    let options = SqliteConnectOptions::new()
        .filename(config.datadir.join(DB_NAME))
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("connect to database")?;

    tricorn_db::MIGRATOR
        .run(&pool)
        .await
        .context("migrate database")?;

    Ok(SqliteDb::new(pool, config.db.clone()))
}

type SignerParts = (Arc<dyn BridgeSigner>, Option<Arc<dyn Communication>>);

fn signer(config: &Config, mode: CommunicationMode) -> anyhow::Result<SignerParts> {
    match mode {
        CommunicationMode::Rpc => {
            let client = Arc::new(
                SignerRpcClient::new(&config.signer.url, config.signer.timeout())
                    .context("build signer client")?,
            );
            info!(url = %config.signer.url, "signing through the signer service");

            Ok((client.clone(), Some(client)))
        }
        CommunicationMode::Mock => {
            warn!("signing in-process with throwaway keys");

            Ok((Arc::new(SignerService::new(throwaway_keys())), None))
        }
    }
}

/// A keystore with a random key for every network type and usage.
fn throwaway_keys() -> InMemoryKeyStore {
    let mut rng = rand::thread_rng();
    let mut store = InMemoryKeyStore::new();

    for network_type in [NetworkType::Evm, NetworkType::Casper, NetworkType::Solana] {
        for usage in [KeyUsage::Transaction, KeyUsage::Signature] {
            let key: [u8; 32] = rng.gen();
            store = store.with_key(network_type, usage, &hex::encode(key));
        }
    }

    store
}

fn spawn_ticker(
    config: &CurrencyRatesConfig,
    stop: &CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    let rates = HttpCurrencyRates::new(config.base_url.clone()).context("build price client")?;
    let ticker = PriceTicker::new(Arc::new(rates), config, stop.clone());
    let mut prices = ticker.subscribe();
    let stop = stop.clone();

    Ok(tokio::spawn(async move {
        let reader = ticker.run(stop.clone());
        let consumer = async {
            loop {
                let price = tokio::select! {
                    biased;

                    _ = stop.cancelled() => break,
                    price = prices.next() => price,
                };

                match price {
                    Some(price) => {
                        info!(symbol = %price.symbol, amount = %price.amount, "price updated")
                    }
                    None => break,
                }
            }
        };

        tokio::join!(reader, consumer);
        debug!("price ticker stopped");
    }))
}

/// Runs the bridge until a shutdown signal arrives or the RPC server fails.
pub(crate) async fn run(config: Config, mode: CommunicationMode) -> anyhow::Result<()> {
    // `stop` ends serving and reconnecting, `shutdown` ends the bridge once its parts are closed.
    let stop = CancellationToken::new();
    let shutdown = CancellationToken::new();
    let signals = cancel_on_signal(stop.clone());

    let db = Arc::new(open_db(&config).await?);
    let (signer, communication) = signer(&config, mode)?;
    let (bridge, registry) = Bridge::new(db, signer.clone(), shutdown.clone());
    let bridge = Arc::new(bridge);

    let chains = config
        .evm
        .iter()
        .cloned()
        .map(ChainConfig::Evm)
        .chain(config.casper.iter().cloned().map(ChainConfig::Casper))
        .collect();
    let supervisor = Arc::new(ConnectorSupervisor::new(
        bridge.clone(),
        signer,
        chains,
        config.reconnect_interval(),
    ));
    let reconnect = tokio::spawn({
        let supervisor = supervisor.clone();
        let stop = stop.clone();
        async move { supervisor.run(stop).await }
    });

    let ticker = config
        .currency_rates
        .as_ref()
        .map(|rates| spawn_ticker(rates, &stop))
        .transpose()?;

    let server = RpcServer::new(config.rpc_addr.clone())
        .with_module("bridge", BridgeRpc::new(bridge.clone()).into_rpc())?;

    let mut peer = Peer::new("tricorn-bridge")
        .with_connector_service(supervisor)
        .with_server(Arc::new(server));
    if let Some(communication) = communication {
        peer = peer.with_communication(communication);
    }

    info!(rpc_addr = %config.rpc_addr, "bridge running");
    let result = peer.run(stop.clone()).await;
    stop.cancel();

    if let Err(err) = reconnect.await {
        warn!(%err, "reconnect task panicked");
    }
    let closed = peer.close().await;

    shutdown.cancel();
    if let Err(err) = registry.await {
        warn!(%err, "connector registry panicked");
    }
    if let Some(ticker) = ticker {
        if let Err(err) = ticker.await {
            warn!(%err, "price ticker panicked");
        }
    }
    signals.abort();

    info!("bridge stopped");
    result?;
    closed?;

    Ok(())
}
