//! The capability surface the orchestrator holds for every connected chain.

use std::fmt::Debug;

use async_trait::async_trait;
use chain_notify::{SubscriberId, Subscription};
use ethnum::U256;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tricorn_primitives::{
    events::{CrossChainAddress, Event},
    networks::NetworkDescriptor,
};

use crate::errors::ConnectorResult;

/// Release of tokens on the connector's chain for a transfer that started elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOutRequest {
    /// Amount in the destination token's base units.
    pub amount: U256,
    /// Token contract on the destination chain.
    pub token: Vec<u8>,
    /// Recipient on the destination chain.
    pub to: Vec<u8>,
    /// Sender on the source chain.
    pub from: CrossChainAddress,
    /// Identifier of the triggering transaction, recorded by the bridge contract.
    pub transaction_id: U256,
    /// Bridge nonce allocated for the destination chain.
    pub nonce: u64,
}

/// Cost and latency of a transfer towards the connector's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimation {
    /// Fee in the chain's native unit, as a decimal string.
    pub fee: String,
    /// Percentage fee charged by the bridge.
    pub fee_percentage: String,
    /// Expected confirmation time in seconds.
    pub estimated_confirmation: u32,
}

/// Inputs of a BridgeIn signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInSignatureRequest {
    /// Address of the user that will call `bridgeIn`.
    pub user: Vec<u8>,
    /// Bridge nonce allocated on the connector's chain.
    pub nonce: U256,
    /// Token contract, hex encoded.
    pub token: String,
    /// Amount to lock.
    pub amount: U256,
    /// Commission withheld for gas on the destination chain.
    pub gas_commission: U256,
    /// Recipient on the destination chain.
    pub destination: CrossChainAddress,
}

/// What a user presents to the bridge contract along with `bridgeIn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInSignature {
    /// Token contract, hex encoded.
    pub token: String,
    /// Amount to lock.
    pub amount: U256,
    /// Commission withheld for gas on the destination chain.
    pub gas_commission: U256,
    /// Recipient on the destination chain.
    pub destination: CrossChainAddress,
    /// Deadline after which the contract rejects the signature, in the chain's time unit.
    pub deadline: u64,
    /// Bridge nonce bound by the signature.
    pub nonce: U256,
    /// The signature.
    pub signature: Vec<u8>,
}

/// Inputs of a signature that lets a user withdraw funds of a cancelled transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelSignatureRequest {
    /// Bridge nonce allocated on the connector's chain.
    pub nonce: U256,
    /// Token contract.
    pub token: Vec<u8>,
    /// Address that receives the refund.
    pub recipient: Vec<u8>,
    /// Commission withheld from the refund.
    pub commission: U256,
    /// Refunded amount.
    pub amount: U256,
}

/// A connected chain, as seen by the orchestrator.
///
/// Implementations own their node client and subscriber list. Everything the orchestrator needs
/// from a chain goes through this trait, so chain specific state never leaks out of the connector.
#[async_trait]
pub trait Connector: Debug + Send + Sync {
    /// Static description of the connected network.
    fn network(&self) -> &NetworkDescriptor;

    /// Registers a new subscriber of the bridge events of this chain.
    fn subscribe(&self) -> Subscription<Event>;

    /// Removes a subscriber. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriberId);

    /// Reads bridge events starting at `from_block` and keeps tailing the chain until `cancel`
    /// fires.
    ///
    /// A `from_block` of zero skips the historical backfill.
    async fn read_events(&self, from_block: u64, cancel: CancellationToken)
        -> ConnectorResult<()>;

    /// Submits the outbound bridge transaction and returns its hash.
    async fn bridge_out(&self, req: BridgeOutRequest) -> ConnectorResult<Vec<u8>>;

    /// Estimates a transfer towards this chain.
    async fn estimate_transfer(&self) -> ConnectorResult<Estimation>;

    /// Produces the signature a user needs to lock funds on this chain.
    async fn bridge_in_signature(
        &self,
        req: BridgeInSignatureRequest,
    ) -> ConnectorResult<BridgeInSignature>;

    /// Produces the signature a user needs to withdraw funds of a cancelled transfer.
    async fn cancel_signature(&self, req: CancelSignatureRequest) -> ConnectorResult<Vec<u8>>;
}
