//! Opens the keystore and serves it.

use std::sync::Arc;

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tricorn_common::peer::{cancel_on_signal, Peer};
use tricorn_primitives::networks::NetworkType;
use tricorn_rpc::{traits::SignerApiServer, RpcServer};
use tricorn_signer::{BridgeSigner, KeyStore, KeyUsage, SignerService, SqliteKeyStore};

use crate::{config::Config, constants::DB_NAME, rpc_server::SignerRpc};

/// Opens the keystore database in the data directory, creating and migrating it as needed.
pub(crate) async fn open_keystore(config: &Config) -> anyhow::Result<SqlitePool> {
    tokio::fs::create_dir_all(&config.datadir)
        .await
        .with_context(|| format!("create data directory {}", config.datadir.display()))?;

    let options = SqliteConnectOptions::new()
        .filename(config.datadir.join(DB_NAME))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .context("connect to keystore")?;

    tricorn_signer::MIGRATOR
        .run(&pool)
        .await
        .context("migrate keystore")?;

    Ok(pool)
}

/// Stores `private_key` and checks that it is usable for `network_type`.
///
/// Returns the hex encoded public key when a transaction key was imported.
pub(crate) async fn import(
    pool: SqlitePool,
    network_type: NetworkType,
    usage: KeyUsage,
    private_key: &str,
) -> anyhow::Result<Option<String>> {
    let store = SqliteKeyStore::new(pool);
    store
        .put_private_key(network_type, usage, private_key)
        .await
        .context("store private key")?;

    let signer = SignerService::new(store);
    signer
        .sign(network_type, &[1; 32], usage)
        .await
        .context("stored key is not usable")?;

    // only transaction keys have a public key to export.
    let public_key = match usage {
        KeyUsage::Transaction => Some(hex::encode(signer.public_key(network_type).await?)),
        KeyUsage::Signature => None,
    };

    info!(%network_type, %usage, "private key imported");
    Ok(public_key)
}

/// Serves signatures until a shutdown signal arrives or the RPC server fails.
pub(crate) async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let signals = cancel_on_signal(cancel.clone());

    let pool = open_keystore(&config).await?;
    let signer: Arc<dyn BridgeSigner> = Arc::new(SignerService::new(SqliteKeyStore::new(pool)));

    let server = RpcServer::new(config.rpc_addr.clone())
        .with_module("signer", SignerRpc::new(signer).into_rpc())?;
    let peer = Peer::new("signer-service").with_server(Arc::new(server));

    info!(rpc_addr = %config.rpc_addr, "signer running");
    let result = peer.run(cancel.clone()).await;
    cancel.cancel();
    let closed = peer.close().await;
    signals.abort();

    info!("signer stopped");
    result?;
    closed?;

    Ok(())
}
