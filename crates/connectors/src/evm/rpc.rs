//! Access to an EVM node.

use std::{fmt, future::Future, time::Duration};

use alloy::{
    eips::BlockId,
    primitives::{Address, TxHash},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{Filter, Log, TransactionRequest},
    transports::TransportResult,
};
use async_trait::async_trait;
use tracing::trace;

use crate::errors::{ConnectorError, ConnectorResult};

/// The node methods the connector relies on.
#[async_trait]
pub trait EvmRpc: fmt::Debug + Send + Sync {
    /// `eth_blockNumber`.
    async fn block_number(&self) -> ConnectorResult<u64>;

    /// `eth_getLogs`.
    async fn get_logs(&self, filter: &Filter) -> ConnectorResult<Vec<Log>>;

    /// `eth_chainId`.
    async fn chain_id(&self) -> ConnectorResult<u64>;

    /// `eth_gasPrice`, in wei.
    async fn gas_price(&self) -> ConnectorResult<u128>;

    /// `eth_estimateGas`.
    async fn estimate_gas(&self, request: &TransactionRequest) -> ConnectorResult<u64>;

    /// `eth_getTransactionCount` at the pending block.
    async fn transaction_count(&self, address: Address) -> ConnectorResult<u64>;

    /// `eth_sendRawTransaction`, returns the transaction hash.
    async fn send_raw_transaction(&self, raw: &[u8]) -> ConnectorResult<TxHash>;
}

/// [`EvmRpc`] over an HTTP provider.
#[derive(Clone)]
pub struct HttpEvmRpc {
    url: String,
    provider: RootProvider,
    request_timeout: Duration,
}

impl fmt::Debug for HttpEvmRpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEvmRpc")
            .field("url", &self.url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl HttpEvmRpc {
    /// Builds a client for `url`.
    ///
    /// Transactions are filled and signed by the connector, so the provider carries no fillers.
    pub fn new(url: &str, request_timeout: Duration) -> ConnectorResult<Self> {
        let parsed = url
            .parse()
            .map_err(|e| ConnectorError::InvalidConfig(format!("node address {url}: {e}")))?;
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(parsed);

        Ok(Self {
            url: url.to_string(),
            provider,
            request_timeout,
        })
    }

    async fn call<T>(
        &self,
        method: &'static str,
        request: impl Future<Output = TransportResult<T>>,
    ) -> ConnectorResult<T> {
        trace!(url = %self.url, method, "calling node");

        tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| ConnectorError::Timeout(method))?
            .map_err(ConnectorError::from)
    }
}

#[async_trait]
impl EvmRpc for HttpEvmRpc {
    async fn block_number(&self) -> ConnectorResult<u64> {
        self.call("eth_blockNumber", async { self.provider.get_block_number().await })
            .await
    }

    async fn get_logs(&self, filter: &Filter) -> ConnectorResult<Vec<Log>> {
        self.call("eth_getLogs", self.provider.get_logs(filter)).await
    }

    async fn chain_id(&self) -> ConnectorResult<u64> {
        self.call("eth_chainId", async { self.provider.get_chain_id().await })
            .await
    }

    async fn gas_price(&self) -> ConnectorResult<u128> {
        self.call("eth_gasPrice", async { self.provider.get_gas_price().await })
            .await
    }

    async fn estimate_gas(&self, request: &TransactionRequest) -> ConnectorResult<u64> {
        let request = request.clone();
        self.call("eth_estimateGas", async {
            self.provider.estimate_gas(request).await
        })
        .await
    }

    async fn transaction_count(&self, address: Address) -> ConnectorResult<u64> {
        self.call("eth_getTransactionCount", async {
            self.provider
                .get_transaction_count(address)
                .block_id(BlockId::pending())
                .await
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> ConnectorResult<TxHash> {
        let pending = self
            .call(
                "eth_sendRawTransaction",
                self.provider.send_raw_transaction(raw),
            )
            .await?;

        Ok(*pending.tx_hash())
    }
}
