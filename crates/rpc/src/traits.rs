//! Traits for the RPC servers.

use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use tricorn_primitives::networks::NetworkType;
use tricorn_signer::KeyUsage;

use crate::types::{
    RpcBridgeInRequest, RpcBridgeInSignature, RpcCancelRequest, RpcCancelledTransfer,
    RpcEstimateRequest, RpcEstimation, RpcHistoryPage, RpcHistoryRequest, RpcNetwork,
    RpcSupportedToken, RpcTransfer,
};

/// RPCs of the bridge.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "bridge"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "bridge"))]
pub trait BridgeApi {
    /// Networks the bridge is currently connected to.
    #[method(name = "connectedNetworks")]
    async fn connected_networks(&self) -> RpcResult<Vec<RpcNetwork>>;

    /// Tokens that can be moved from the given network.
    #[method(name = "supportedTokens")]
    async fn supported_tokens(&self, network_id: u32) -> RpcResult<Vec<RpcSupportedToken>>;

    /// The transfer triggered by a deposit transaction.
    #[method(name = "transfersInfo")]
    async fn transfers_info(&self, network_name: String, tx_hash: String)
        -> RpcResult<RpcTransfer>;

    /// A page of the transfers of an authenticated user.
    #[method(name = "history")]
    async fn history(&self, request: RpcHistoryRequest) -> RpcResult<RpcHistoryPage>;

    /// Fee and confirmation time of a transfer.
    #[method(name = "estimateTransfer")]
    async fn estimate_transfer(&self, request: RpcEstimateRequest) -> RpcResult<RpcEstimation>;

    /// Signature allowing a user to lock funds in the bridge contract.
    #[method(name = "bridgeInSignature")]
    async fn bridge_in_signature(
        &self,
        request: RpcBridgeInRequest,
    ) -> RpcResult<RpcBridgeInSignature>;

    /// Cancels a transfer that has not been released yet and signs the refund.
    #[method(name = "cancelTransfer")]
    async fn cancel_transfer(&self, request: RpcCancelRequest) -> RpcResult<RpcCancelledTransfer>;
}

/// RPCs of the custodial signer.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "signer"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "signer"))]
pub trait SignerApi {
    /// Signs hex encoded `data` with the key of `network_type` held for `usage`.
    ///
    /// Returns the hex encoded signature.
    #[method(name = "sign")]
    async fn sign(
        &self,
        network_type: NetworkType,
        data: String,
        usage: KeyUsage,
    ) -> RpcResult<String>;

    /// Hex encoded public key of the transaction key of `network_type`.
    #[method(name = "publicKey")]
    async fn public_key(&self, network_type: NetworkType) -> RpcResult<String>;
}
