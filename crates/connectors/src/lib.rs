//! Per-chain connectors of the bridge.
//!
//! A connector owns the client of one blockchain node. It tails the node for bridge contract
//! events, lifts them into the chain-neutral [`Event`](tricorn_primitives::events::Event) form and
//! publishes them to its subscribers. It also builds, signs and submits the outbound bridge
//! transactions of its chain, and produces the signatures users present to the bridge contract.
//!
//! The orchestrator only ever sees the [`Connector`] trait.

pub mod casper;
pub mod errors;
pub mod evm;
pub mod splitter;
pub mod traits;

pub use errors::{ConnectorError, ConnectorResult};
pub use traits::{
    BridgeInSignature, BridgeInSignatureRequest, BridgeOutRequest, CancelSignatureRequest,
    Connector, Estimation,
};
