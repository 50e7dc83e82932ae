//! Errors raised by the codec and the signature helpers.

use thiserror::Error;

use crate::networks::NetworkType;

/// Rejections produced while decoding or validating chain-specific strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The string is not a valid address for the network.
    #[error("invalid {network_type} address: {address}")]
    InvalidAddress {
        /// Family of the network the address was validated against.
        network_type: NetworkType,
        /// The offending input.
        address: String,
    },

    /// The string is not a valid transaction or block hash for the network.
    #[error("invalid {network_type} hash: {hash}")]
    InvalidHash {
        /// Family of the network the hash was validated against.
        network_type: NetworkType,
        /// The offending input.
        hash: String,
    },

    /// The network type is outside the supported set.
    #[error("network is not supported or its type invalid: {0}")]
    UnsupportedNetworkType(String),

    /// The network name is outside the supported set.
    #[error("network is not supported or its name invalid: {0}")]
    UnsupportedNetworkName(String),

    /// The numeric network id is outside the supported set.
    #[error("unsupported network id {0}")]
    UnsupportedNetworkId(u32),

    /// The input failed to decode as hex or base58.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),
}

/// Failures of signature verification and public key handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// No public key bytes were supplied.
    #[error("empty public key")]
    EmptyPublicKey,

    /// The public key tag names an algorithm the bridge does not support.
    #[error("public key created using unsupported algorithm")]
    InvalidAlgorithm,

    /// The signature has the wrong length or trailing recovery byte.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The key or signature could not be parsed by the curve library.
    #[error("malformed key material: {0}")]
    MalformedKey(String),

    /// The signature does not match the message and key.
    #[error("signature verification failed")]
    VerificationFailed,
}
