//! Keeps the configured chains connected.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chain_notify::{Fanout, FanoutConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tricorn_common::peer::ConnectorService;
use tricorn_connectors::{
    casper::{config::CasperConfig, rpc::HttpCasperRpc, CasperConnector},
    evm::{config::EvmConfig, rpc::HttpEvmRpc, EvmConnector},
    Connector,
};
use tricorn_db::BridgeDb;
use tricorn_orchestrator::Bridge;
use tricorn_primitives::networks::Network;
use tricorn_signer::BridgeSigner;

/// The chain a connector is built for.
#[derive(Debug, Clone)]
pub(crate) enum ChainConfig {
    Evm(EvmConfig),
    Casper(CasperConfig),
}

impl ChainConfig {
    pub(crate) fn network(&self) -> Network {
        match self {
            ChainConfig::Evm(config) => config.chain_name,
            ChainConfig::Casper(config) => config.chain_name,
        }
    }
}

/// Adds a connector for every configured chain that is not connected, on every tick.
///
/// A connector whose reader fails is dropped by the bridge and comes back on a later tick.
#[derive(Debug)]
pub(crate) struct ConnectorSupervisor<D> {
    bridge: Arc<Bridge<D>>,
    signer: Arc<dyn BridgeSigner>,
    chains: Vec<ChainConfig>,
    interval: Duration,
}

impl<D: BridgeDb + 'static> ConnectorSupervisor<D> {
    pub(crate) fn new(
        bridge: Arc<Bridge<D>>,
        signer: Arc<dyn BridgeSigner>,
        chains: Vec<ChainConfig>,
        interval: Duration,
    ) -> Self {
        Self {
            bridge,
            signer,
            chains,
            interval,
        }
    }

    /// Reconnects until `cancel` fires.
    pub(crate) async fn run(&self, cancel: CancellationToken) {
        loop {
            self.connect_missing(&cancel).await;

            tokio::select! {
                biased;

                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Connects the chains that are not connected, returning how many were added.
    pub(crate) async fn connect_missing(&self, cancel: &CancellationToken) -> usize {
        let mut added = 0;

        for chain in &self.chains {
            let network = chain.network();
            match self.bridge.is_connector_connected(network).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    warn!(%network, %err, "could not query connector registry");
                    return added;
                }
            }

            let connector = match self.connect(chain, cancel).await {
                Ok(connector) => connector,
                Err(err) => {
                    warn!(%network, %err, "could not connect");
                    continue;
                }
            };

            match self.bridge.add_connector(connector).await {
                Ok(()) => added += 1,
                Err(err) => warn!(%network, %err, "could not add connector"),
            }
        }

        added
    }

    async fn connect(
        &self,
        chain: &ChainConfig,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Arc<dyn Connector>> {
        let fanout = Fanout::new(FanoutConfig::default(), cancel.child_token());

        let connector: Arc<dyn Connector> = match chain {
            ChainConfig::Evm(config) => {
                let rpc = HttpEvmRpc::new(&config.node_address, config.request_timeout())?;
                let connector =
                    EvmConnector::new(config.clone(), rpc, self.signer.clone(), fanout)?;
                connector.check_chain_id().await?;

                Arc::new(connector)
            }
            ChainConfig::Casper(config) => {
                let rpc = HttpCasperRpc::new(&config.node_address, config.request_timeout())?;

                Arc::new(CasperConnector::new(
                    config.clone(),
                    rpc,
                    self.signer.clone(),
                    fanout,
                )?)
            }
        };

        debug!(network = %chain.network(), "connector built");
        Ok(connector)
    }
}

#[async_trait]
impl<D: BridgeDb + 'static> ConnectorService for ConnectorSupervisor<D> {
    async fn close_client(&self) {
        for chain in &self.chains {
            let network = chain.network();
            match self.bridge.remove_connector(network).await {
                Ok(true) => info!(%network, "connector removed"),
                Ok(false) => {}
                // the registry stops with the bridge, taking its connectors with it.
                Err(err) => debug!(%network, %err, "could not remove connector"),
            }
        }
    }
}
