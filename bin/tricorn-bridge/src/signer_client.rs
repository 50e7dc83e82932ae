//! Client of the signer process.

use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use tracing::debug;
use tricorn_common::peer::Communication;
use tricorn_primitives::networks::NetworkType;
use tricorn_rpc::traits::SignerApiClient;
use tricorn_signer::{BridgeSigner, KeyUsage, SignerError, SignerResult};

/// Forwards signing requests to the signer's JSON-RPC server.
#[derive(Debug, Clone)]
pub(crate) struct SignerRpcClient {
    url: String,
    client: HttpClient,
}

impl SignerRpcClient {
    pub(crate) fn new(url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = HttpClientBuilder::default()
            .request_timeout(request_timeout)
            .build(url)?;

        Ok(Self {
            url: url.to_owned(),
            client,
        })
    }
}

fn transport(err: impl std::fmt::Display) -> SignerError {
    SignerError::Transport(err.to_string())
}

#[async_trait]
impl BridgeSigner for SignerRpcClient {
    async fn sign(
        &self,
        network_type: NetworkType,
        data: &[u8],
        usage: KeyUsage,
    ) -> SignerResult<Vec<u8>> {
        let signature = SignerApiClient::sign(&self.client, network_type, hex::encode(data), usage)
            .await
            .map_err(transport)?;

        hex::decode(signature).map_err(transport)
    }

    async fn public_key(&self, network_type: NetworkType) -> SignerResult<Vec<u8>> {
        let public_key = SignerApiClient::public_key(&self.client, network_type)
            .await
            .map_err(transport)?;

        hex::decode(public_key).map_err(transport)
    }
}

#[async_trait]
impl Communication for SignerRpcClient {
    async fn close(&self) -> anyhow::Result<()> {
        // the http client holds no connection between requests.
        debug!(url = %self.url, "signer client closed");
        Ok(())
    }
}
