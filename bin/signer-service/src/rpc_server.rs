//! Signer RPC server implementation.

use std::sync::Arc;

use async_trait::async_trait;
use jsonrpsee::{core::RpcResult, types::ErrorObjectOwned};
use tracing::{debug, warn};
use tricorn_primitives::networks::NetworkType;
use tricorn_rpc::{
    errors::{failed_precondition, internal, invalid_params},
    traits::SignerApiServer,
};
use tricorn_signer::{BridgeSigner, KeyUsage, SignerError};

/// Serves the signer API on top of a [`BridgeSigner`].
#[derive(Debug, Clone)]
pub(crate) struct SignerRpc {
    signer: Arc<dyn BridgeSigner>,
}

impl SignerRpc {
    pub(crate) fn new(signer: Arc<dyn BridgeSigner>) -> Self {
        Self { signer }
    }
}

#[async_trait]
impl SignerApiServer for SignerRpc {
    async fn sign(
        &self,
        network_type: NetworkType,
        data: String,
        usage: KeyUsage,
    ) -> RpcResult<String> {
        let data = hex::decode(&data).map_err(|e| invalid_params(format!("data: {e}")))?;

        let signature = self
            .signer
            .sign(network_type, &data, usage)
            .await
            .map_err(rpc_error)?;
        debug!(%network_type, %usage, "signed");

        Ok(hex::encode(signature))
    }

    async fn public_key(&self, network_type: NetworkType) -> RpcResult<String> {
        let public_key = self
            .signer
            .public_key(network_type)
            .await
            .map_err(rpc_error)?;

        Ok(hex::encode(public_key))
    }
}

fn rpc_error(err: SignerError) -> ErrorObjectOwned {
    if err.is_precondition() {
        debug!(%err, "rejected request");
        return failed_precondition(err.to_string());
    }

    warn!(%err, "signing failed");
    internal(err.to_string())
}
