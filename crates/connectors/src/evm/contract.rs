//! Bindings of the bridge contract.

use alloy::{
    primitives::{Address, U256},
    sol,
};

use crate::errors::{ConnectorError, ConnectorResult};

sol! {
    /// Emitted when a user locks funds towards another chain.
    event BridgeFundsIn(
        /// Caller of `bridgeIn`.
        address indexed sender,
        /// Bridge nonce bound by the user's signature.
        uint256 indexed nonce,
        /// Locked token.
        address token,
        /// Locked amount.
        uint256 amount,
        /// Commission withheld in stable coins, in percent.
        uint256 stableCommissionPercent,
        /// Commission withheld for gas on the destination chain.
        uint256 gasCommission,
        /// Destination network name.
        string destinationChain,
        /// Recipient on the destination network.
        string destinationAddress,
    );

    /// Emitted when the bridge releases funds of a transfer that started elsewhere.
    event BridgeFundsOut(
        /// Receiver of the released funds.
        address indexed recipient,
        /// Released token.
        address token,
        /// Released amount.
        uint256 amount,
        /// Identifier of the transaction that started the transfer.
        uint256 transactionId,
        /// Source network name.
        string sourceChain,
        /// Sender on the source network.
        string sourceAddress,
    );

    /// Releases funds of a transfer that started on `sourceChain`.
    function bridgeOut(
        address token,
        address recipient,
        uint256 amount,
        uint256 transactionId,
        string sourceChain,
        string sourceAddress
    ) external;
}

/// Converts an amount of the bridge domain into a contract word.
pub fn to_word(value: ethnum::U256) -> U256 {
    U256::from_be_bytes(value.to_be_bytes())
}

/// Converts a contract word into an amount of the bridge domain.
pub fn from_word(value: U256) -> ethnum::U256 {
    ethnum::U256::from_be_bytes(value.to_be_bytes::<32>())
}

/// Reads an EVM address out of stored or decoded bytes.
pub fn to_address(bytes: &[u8]) -> ConnectorResult<Address> {
    Address::try_from(bytes).map_err(|_| {
        ConnectorError::InvalidRequest(format!(
            "{} is not a 20 byte address",
            hex::encode(bytes)
        ))
    })
}
