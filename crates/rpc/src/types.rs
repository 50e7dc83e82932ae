//! Wire types of the RPC servers.
//!
//! Amounts and nonces are decimal strings, byte strings are hex unless they are addresses or
//! hashes, which use the native encoding of their network.

use serde::{Deserialize, Serialize};
use tricorn_primitives::{
    events::CrossChainAddress,
    networks::{NetworkDescriptor, NetworkType},
    transfer::TransferStatus,
};

/// A connected network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcNetwork {
    /// Network id.
    pub id: u32,
    /// Wire name.
    pub name: String,
    /// Family of the network.
    pub network_type: NetworkType,
    /// Whether this is a test network.
    pub is_testnet: bool,
    /// Node the bridge reads from.
    pub node_address: String,
    /// Token contract, if the network has a default one.
    pub token_contract: String,
    /// Bridge contract.
    pub bridge_contract: String,
    /// Gas limit of outbound transactions.
    pub gas_limit: u64,
}

impl From<&NetworkDescriptor> for RpcNetwork {
    fn from(descriptor: &NetworkDescriptor) -> Self {
        let network = descriptor.network;

        Self {
            id: network.id(),
            name: network.name().to_owned(),
            network_type: network.network_type(),
            is_testnet: network.is_testnet(),
            node_address: descriptor.node_address.clone(),
            token_contract: descriptor.token_contract.clone(),
            bridge_contract: descriptor.bridge_contract.clone(),
            gas_limit: descriptor.gas_limit,
        }
    }
}

/// Contract of a token on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcTokenContract {
    /// Network id.
    pub network_id: u32,
    /// Contract address.
    pub address: String,
    /// Decimals on that network.
    pub decimals: u32,
}

/// A token the bridge can move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcSupportedToken {
    /// Token id.
    pub id: i64,
    /// Ticker.
    pub short_name: String,
    /// Human readable name.
    pub long_name: String,
    /// Contracts of the token on every network it is known on.
    pub wraps: Vec<RpcTokenContract>,
}

/// A transaction on a named network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcTxReference {
    /// Wire name of the network.
    pub network_name: String,
    /// Transaction hash.
    pub hash: String,
}

/// A transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcTransfer {
    /// Transfer id.
    pub id: i64,
    /// Decimal amount in token base units.
    pub amount: String,
    /// Depositor.
    pub sender: CrossChainAddress,
    /// Recipient.
    pub recipient: CrossChainAddress,
    /// Status.
    pub status: TransferStatus,
    /// Deposit transaction.
    pub triggering_tx: RpcTxReference,
    /// Release transaction, once submitted.
    pub outbound_tx: Option<RpcTxReference>,
    /// Unix time in seconds the deposit was observed at.
    pub created_at: i64,
}

/// Request for a user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcHistoryRequest {
    /// Transfers to skip.
    pub offset: u64,
    /// Maximum number of transfers.
    pub limit: u64,
    /// Hex signature over the authentication proof.
    pub signature: String,
    /// Hex public key of the signer, required outside EVM networks.
    #[serde(default)]
    pub public_key: Option<String>,
    /// Network of the user.
    pub network_id: u32,
}

/// A page of a user's transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcHistoryPage {
    /// Transfers, newest first.
    pub transfers: Vec<RpcTransfer>,
    /// Offset of the page.
    pub offset: u64,
    /// Limit of the page.
    pub limit: u64,
    /// Number of transfers of the user.
    pub total_count: u64,
}

/// Inputs of an estimation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEstimateRequest {
    /// Wire name of the source network.
    pub sender_network: String,
    /// Wire name of the destination network.
    pub recipient_network: String,
    /// Token id.
    pub token_id: i64,
    /// Decimal amount.
    pub amount: String,
}

/// Result of an estimation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEstimation {
    /// Fee in token base units.
    pub fee: String,
    /// Fee as a percentage of the amount.
    pub fee_percentage: String,
    /// Expected seconds until release.
    pub estimated_confirmation: u64,
}

/// Request for a BridgeIn signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcBridgeInRequest {
    /// Depositor.
    pub sender: CrossChainAddress,
    /// Token id.
    pub token_id: i64,
    /// Decimal amount.
    pub amount: String,
    /// Recipient on the destination network.
    pub destination: CrossChainAddress,
}

/// Payload and signature a user presents to the bridge contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcBridgeInSignature {
    /// Token contract on the source network.
    pub token: String,
    /// Decimal amount.
    pub amount: String,
    /// Decimal gas commission.
    pub gas_commission: String,
    /// Recipient on the destination network.
    pub destination: CrossChainAddress,
    /// Unix time the signature expires at.
    pub deadline: u64,
    /// Decimal bridge nonce.
    pub nonce: String,
    /// Hex signature.
    pub signature: String,
}

/// Request to cancel a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcCancelRequest {
    /// Network of the deposit.
    pub network_id: u32,
    /// Deposit transaction hash.
    pub tx_hash: String,
    /// Address withdrawing the refund.
    pub recipient: String,
}

/// A cancelled transfer and its refund signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcCancelledTransfer {
    /// Status after cancellation.
    pub status: TransferStatus,
    /// Bridge nonce.
    pub nonce: u64,
    /// Hex refund signature.
    pub signature: String,
    /// Token contract on the deposit network.
    pub token: String,
    /// Depositor.
    pub recipient: String,
    /// Decimal commission.
    pub commission: String,
    /// Decimal refunded amount.
    pub amount: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tricorn_primitives::networks::Network;

    use super::*;

    #[test]
    fn test_network_from_descriptor() {
        let descriptor = NetworkDescriptor {
            network: Network::Goerli,
            node_address: "http://localhost:8545".to_owned(),
            token_contract: String::new(),
            bridge_contract: "e0b7a6f1a5a2f4f6a8e7e0a0b0c0d0e0f0a0b0c0".to_owned(),
            gas_limit: 300_000,
        };

        let network = RpcNetwork::from(&descriptor);
        assert_eq!(network.id, 5);
        assert_eq!(network.name, "GOERLI");
        assert_eq!(network.network_type, NetworkType::Evm);
        assert!(network.is_testnet, "goerli must be a test network");
    }

    #[test]
    fn test_history_request_public_key_is_optional() {
        let request: RpcHistoryRequest = serde_json::from_value(json!({
            "offset": 0,
            "limit": 10,
            "signature": "00",
            "network_id": 5,
        }))
        .expect("must deserialize");

        assert_eq!(request.public_key, None);
    }
}
