//! Connector errors.

use thiserror::Error;
use tricorn_primitives::errors::{CodecError, SignatureError};
use tricorn_signer::SignerError;

use crate::splitter::SplitError;

/// Errors that can occur while reading from or writing to a chain.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The node reported a log that was removed by a reorganization.
    #[error("blockchain rework detected")]
    BlockchainRework,

    /// A log matched the bridge contract but none of the known event topics.
    #[error("unknown log type: {0}")]
    UnknownLogType(String),

    /// A BridgeIn signature was requested for an amount that does not cover the gas commission.
    #[error("the amount must be greater than the gas commission")]
    CommissionExceedsAmount,

    /// The event payload could not be decoded.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// The Casper event blob carries an unknown type tag.
    #[error("unknown event type: {0}")]
    UnknownEventType(u8),

    /// The node answered with something that is not what the method promises.
    #[error("unexpected node response: {0}")]
    UnexpectedResponse(String),

    /// A request carries a value the chain cannot represent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The connector configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport or protocol failure talking to the node.
    #[error("rpc: {0}")]
    Rpc(#[from] jsonrpsee::core::ClientError),

    /// Transport or protocol failure talking to an EVM node.
    #[error("evm rpc: {0}")]
    Transport(#[from] alloy::transports::TransportError),

    /// The node did not answer in time.
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// (De)serialization of a node payload failed.
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The signer refused or failed to sign.
    #[error("signer: {0}")]
    Signer(#[from] SignerError),

    /// An address or hash could not be decoded.
    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    /// A signature or public key is unusable.
    #[error("signature: {0}")]
    Signature(#[from] SignatureError),

    /// A block range could not be split.
    #[error(transparent)]
    Split(#[from] SplitError),
}

/// Result alias for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
