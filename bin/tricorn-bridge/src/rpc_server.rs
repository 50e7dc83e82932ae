//! Bridge RPC server implementation.

use std::sync::Arc;

use async_trait::async_trait;
use jsonrpsee::{core::RpcResult, types::ErrorObjectOwned};
use tracing::{debug, warn};
use tricorn_connectors::{BridgeInSignature, Estimation};
use tricorn_db::BridgeDb;
use tricorn_orchestrator::{
    types::{
        BridgeInRequest, CancelRequest, CancelledTransfer, EstimateRequest, HistoryPage,
        HistoryRequest, SupportedToken, TransferView, TxReference,
    },
    Bridge, BridgeError,
};
use tricorn_primitives::{codec::bytes_to_string, networks::Network};
use tricorn_rpc::{
    errors::{failed_precondition, internal, invalid_params},
    traits::BridgeApiServer,
    types::{
        RpcBridgeInRequest, RpcBridgeInSignature, RpcCancelRequest, RpcCancelledTransfer,
        RpcEstimateRequest, RpcEstimation, RpcHistoryPage, RpcHistoryRequest, RpcNetwork,
        RpcSupportedToken, RpcTokenContract, RpcTransfer, RpcTxReference,
    },
};

/// Serves the bridge API on top of a [`Bridge`].
#[derive(Debug)]
pub(crate) struct BridgeRpc<D> {
    bridge: Arc<Bridge<D>>,
}

impl<D> Clone for BridgeRpc<D> {
    fn clone(&self) -> Self {
        Self {
            bridge: self.bridge.clone(),
        }
    }
}

impl<D> BridgeRpc<D> {
    pub(crate) fn new(bridge: Arc<Bridge<D>>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl<D: BridgeDb + 'static> BridgeApiServer for BridgeRpc<D> {
    async fn connected_networks(&self) -> RpcResult<Vec<RpcNetwork>> {
        let networks = self
            .bridge
            .list_connected_networks()
            .await
            .map_err(rpc_error)?;

        Ok(networks.iter().map(RpcNetwork::from).collect())
    }

    async fn supported_tokens(&self, network_id: u32) -> RpcResult<Vec<RpcSupportedToken>> {
        let tokens = self
            .bridge
            .list_supported_tokens(network_id)
            .await
            .map_err(rpc_error)?;

        Ok(tokens.into_iter().map(supported_token).collect())
    }

    async fn transfers_info(
        &self,
        network_name: String,
        tx_hash: String,
    ) -> RpcResult<RpcTransfer> {
        let transfer = self
            .bridge
            .transfers_info(&network_name, &tx_hash)
            .await
            .map_err(rpc_error)?;

        Ok(transfer_view(transfer))
    }

    async fn history(&self, request: RpcHistoryRequest) -> RpcResult<RpcHistoryPage> {
        let signature = hex::decode(&request.signature)
            .map_err(|e| invalid_params(format!("signature: {e}")))?;
        let public_key = request
            .public_key
            .as_deref()
            .map(hex::decode)
            .transpose()
            .map_err(|e| invalid_params(format!("public key: {e}")))?;

        let page = self
            .bridge
            .history(&HistoryRequest {
                offset: request.offset,
                limit: request.limit,
                signature,
                public_key,
                network_id: request.network_id,
            })
            .await
            .map_err(rpc_error)?;

        Ok(history_page(page))
    }

    async fn estimate_transfer(&self, request: RpcEstimateRequest) -> RpcResult<RpcEstimation> {
        let estimation = self
            .bridge
            .estimate_transfer(&EstimateRequest {
                sender_network: request.sender_network,
                recipient_network: request.recipient_network,
                token_id: request.token_id,
                amount: request.amount,
            })
            .await
            .map_err(rpc_error)?;

        Ok(estimation_view(estimation))
    }

    async fn bridge_in_signature(
        &self,
        request: RpcBridgeInRequest,
    ) -> RpcResult<RpcBridgeInSignature> {
        let signature = self
            .bridge
            .bridge_in_signature(&BridgeInRequest {
                sender: request.sender,
                token_id: request.token_id,
                amount: request.amount,
                destination: request.destination,
            })
            .await
            .map_err(rpc_error)?;

        Ok(bridge_in_view(signature))
    }

    async fn cancel_transfer(&self, request: RpcCancelRequest) -> RpcResult<RpcCancelledTransfer> {
        let network = Network::from_id(request.network_id)
            .map_err(|e| invalid_params(e.to_string()))?;

        let cancelled = self
            .bridge
            .cancel_transfer(&CancelRequest {
                network_id: request.network_id,
                tx_hash: request.tx_hash,
                recipient: request.recipient,
            })
            .await
            .map_err(rpc_error)?;

        Ok(cancelled_view(network, cancelled))
    }
}

/// Maps the failures of the bridge to the error objects of the API.
fn rpc_error(err: BridgeError) -> ErrorObjectOwned {
    let message = err.to_string();

    match &err {
        BridgeError::Codec(_)
        | BridgeError::InvalidAmount(_)
        | BridgeError::NoNetworkToken { .. }
        | BridgeError::Signature(_) => {
            debug!(%err, "rejected request");
            invalid_params(message)
        }
        BridgeError::NotConnectedNetwork(_)
        | BridgeError::InvalidTransferStatus { .. }
        | BridgeError::NoTransfer(_) => {
            debug!(%err, "rejected request");
            failed_precondition(message)
        }
        BridgeError::Signer(signer) if signer.is_precondition() => failed_precondition(message),
        _ => {
            warn!(%err, "request failed");
            internal(message)
        }
    }
}

fn supported_token(token: SupportedToken) -> RpcSupportedToken {
    RpcSupportedToken {
        id: token.id,
        short_name: token.short_name,
        long_name: token.long_name,
        wraps: token
            .contracts
            .into_iter()
            .map(|contract| RpcTokenContract {
                network_id: contract.network_id,
                address: contract.address,
                decimals: contract.decimals,
            })
            .collect(),
    }
}

fn tx_reference(tx: TxReference) -> RpcTxReference {
    RpcTxReference {
        network_name: tx.network_name,
        hash: tx.hash,
    }
}

fn transfer_view(transfer: TransferView) -> RpcTransfer {
    RpcTransfer {
        id: transfer.id,
        amount: transfer.amount.to_string(),
        sender: transfer.sender,
        recipient: transfer.recipient,
        status: transfer.status,
        triggering_tx: tx_reference(transfer.triggering_tx),
        outbound_tx: transfer.outbound_tx.map(tx_reference),
        created_at: transfer.created_at.timestamp(),
    }
}

fn history_page(page: HistoryPage) -> RpcHistoryPage {
    RpcHistoryPage {
        transfers: page.transfers.into_iter().map(transfer_view).collect(),
        offset: page.offset,
        limit: page.limit,
        total_count: page.total_count,
    }
}

fn estimation_view(estimation: Estimation) -> RpcEstimation {
    RpcEstimation {
        fee: estimation.fee,
        fee_percentage: estimation.fee_percentage,
        estimated_confirmation: estimation.estimated_confirmation.into(),
    }
}

fn bridge_in_view(signature: BridgeInSignature) -> RpcBridgeInSignature {
    RpcBridgeInSignature {
        token: signature.token,
        amount: signature.amount.to_string(),
        gas_commission: signature.gas_commission.to_string(),
        destination: signature.destination,
        deadline: signature.deadline,
        nonce: signature.nonce.to_string(),
        signature: hex::encode(signature.signature),
    }
}

fn cancelled_view(network: Network, cancelled: CancelledTransfer) -> RpcCancelledTransfer {
    RpcCancelledTransfer {
        status: cancelled.status,
        nonce: cancelled.nonce,
        signature: hex::encode(cancelled.signature),
        token: bytes_to_string(network, &cancelled.token),
        recipient: bytes_to_string(network, &cancelled.recipient),
        commission: cancelled.commission.to_string(),
        amount: cancelled.amount.to_string(),
    }
}
