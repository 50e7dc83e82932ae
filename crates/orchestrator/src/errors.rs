//! Error types for the orchestrator crate.

use thiserror::Error;
use tricorn_connectors::ConnectorError;
use tricorn_db::errors::DbError;
use tricorn_primitives::{
    errors::{CodecError, SignatureError},
    networks::Network,
    transfer::TransferStatus,
};
use tricorn_signer::SignerError;

/// Errors raised by the bridge service and its event handlers.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The event stream of a connector ended while the chore was still reading it.
    #[error("events channel of {0} unexpectedly closed")]
    EventsChannelClosed(Network),

    /// The network is supported but no connector for it is registered.
    #[error("network {0} is not connected")]
    NotConnectedNetwork(Network),

    /// An amount is not a non-negative decimal integer.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The transfer is not in a status that allows the requested operation.
    #[error("transfer {id} is {status}")]
    InvalidTransferStatus {
        /// Id of the transfer.
        id: i64,
        /// Its current status.
        status: TransferStatus,
    },

    /// No contract of the token is registered on the network.
    #[error("no token {token} on {network}")]
    NoNetworkToken {
        /// The network.
        network: Network,
        /// Contract address or token id, as given.
        token: String,
    },

    /// No transfer was triggered by the given transaction.
    #[error("no transfer triggered by {0}")]
    NoTransfer(String),

    /// A transfer refers to a transaction that is not recorded.
    #[error("transaction {0} is not recorded")]
    NoTransaction(i64),

    /// The connector registry task is gone.
    #[error("connector registry is closed")]
    RegistryClosed,

    /// A connector with the same name is already registered.
    #[error("connector for {0} is already registered")]
    AlreadyConnected(Network),

    /// The store failed.
    #[error("db: {0}")]
    Db(#[from] DbError),

    /// A connector failed.
    #[error("connector: {0}")]
    Connector(#[from] ConnectorError),

    /// A user supplied name, address or hash was rejected.
    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    /// A connector describes a bridge contract its network cannot address.
    #[error("bridge contract of {network} is not decodable: {source}")]
    InvalidBridgeContract {
        /// Network of the connector.
        network: Network,
        /// Why decoding failed.
        source: CodecError,
    },

    /// A user signature could not be verified.
    #[error("signature: {0}")]
    Signature(#[from] SignatureError),

    /// The signer failed.
    #[error("signer: {0}")]
    Signer(#[from] SignerError),
}

impl BridgeError {
    /// Whether handling the same input again can succeed.
    ///
    /// Names and addresses carried by an event are fixed once it is on chain, so a replay fails
    /// the same way.
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Codec(_))
    }
}

/// Result alias for orchestrator operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
