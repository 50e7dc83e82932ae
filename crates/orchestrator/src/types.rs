//! Requests and views of the bridge service.

use chrono::{DateTime, Utc};
use ethnum::U256;
use tricorn_primitives::{events::CrossChainAddress, transfer::TransferStatus};

/// Contract of a token on one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenContract {
    /// Network the contract lives on.
    pub network_id: u32,
    /// Contract address in the network's native encoding.
    pub address: String,
    /// Decimals of the token on that network.
    pub decimals: u32,
}

/// A token the bridge can move, with its contract on every network it is known on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedToken {
    /// Token id.
    pub id: i64,
    /// Ticker.
    pub short_name: String,
    /// Human readable name.
    pub long_name: String,
    /// Contracts ordered by network id.
    pub contracts: Vec<TokenContract>,
}

/// A transaction hash on a named network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReference {
    /// Wire name of the network.
    pub network_name: String,
    /// Hash in the network's native encoding.
    pub hash: String,
}

/// A transfer rendered for clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferView {
    /// Transfer id.
    pub id: i64,
    /// Amount in token base units.
    pub amount: U256,
    /// Depositor.
    pub sender: CrossChainAddress,
    /// Recipient.
    pub recipient: CrossChainAddress,
    /// Current status.
    pub status: TransferStatus,
    /// The deposit transaction.
    pub triggering_tx: TxReference,
    /// The release transaction, once one is bound.
    pub outbound_tx: Option<TxReference>,
    /// When the deposit was observed.
    pub created_at: DateTime<Utc>,
}

/// A page of a user's transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    /// Transfers, newest first.
    pub transfers: Vec<TransferView>,
    /// Offset the page starts at.
    pub offset: u64,
    /// Maximum size of the page.
    pub limit: u64,
    /// Number of transfers of the user.
    pub total_count: u64,
}

/// Authenticated request for a user's transfer history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Number of transfers to skip.
    pub offset: u64,
    /// Maximum number of transfers to return.
    pub limit: u64,
    /// Signature over the authentication proof.
    pub signature: Vec<u8>,
    /// Public key of the signer, required by non-EVM networks.
    pub public_key: Option<Vec<u8>>,
    /// Network of the user.
    pub network_id: u32,
}

/// Inputs of a transfer estimation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateRequest {
    /// Wire name of the source network.
    pub sender_network: String,
    /// Wire name of the destination network.
    pub recipient_network: String,
    /// Token to move.
    pub token_id: i64,
    /// Decimal amount in token base units.
    pub amount: String,
}

/// A user's request for a BridgeIn signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInRequest {
    /// Network and address of the depositor.
    pub sender: CrossChainAddress,
    /// Token to lock.
    pub token_id: i64,
    /// Decimal amount in token base units.
    pub amount: String,
    /// Recipient on the destination network.
    pub destination: CrossChainAddress,
}

/// A user's request to cancel a transfer that has not been released yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequest {
    /// Network the deposit was made on.
    pub network_id: u32,
    /// Hash of the deposit transaction.
    pub tx_hash: String,
    /// Address that withdraws the refund.
    pub recipient: String,
}

/// Everything a user needs to withdraw the funds of a cancelled transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelledTransfer {
    /// Status of the transfer after cancellation.
    pub status: TransferStatus,
    /// Bridge nonce bound by the signature.
    pub nonce: u64,
    /// The refund signature.
    pub signature: Vec<u8>,
    /// Token contract on the deposit network.
    pub token: Vec<u8>,
    /// The depositor.
    pub recipient: Vec<u8>,
    /// Commission withheld from the refund.
    pub commission: U256,
    /// Refunded amount.
    pub amount: U256,
}
