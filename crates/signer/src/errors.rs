//! Signer errors.

use thiserror::Error;
use tricorn_primitives::networks::NetworkType;

use crate::usage::KeyUsage;

/// Errors that can occur while producing signatures or public keys.
#[derive(Debug, Error)]
pub enum SignerError {
    /// No key is stored for the requested pair.
    #[error("no private key for {network_type} with usage {usage}")]
    NoPrivateKey {
        /// Family of the network.
        network_type: NetworkType,
        /// Requested usage.
        usage: KeyUsage,
    },

    /// The stored key has a length no scheme of the network accepts.
    #[error("invalid private key length: {0}")]
    InvalidKeyLength(usize),

    /// The stored key is not valid hex or not a valid scalar.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// secp256k1 schemes sign 32 byte digests only.
    #[error("expected a 32 byte digest, got {0} bytes")]
    InvalidDigestLength(usize),

    /// The network type is outside the supported set.
    #[error("unsupported network type: {0}")]
    UnsupportedNetworkType(String),

    /// The usage string is neither `DT_TRANSACTION` nor `DT_SIGNATURE`.
    #[error("unknown key usage: {0}")]
    UnknownKeyUsage(String),

    /// The keystore could not be read.
    #[error("keystore: {0}")]
    Storage(#[from] sqlx::Error),

    /// A remote signer could not be reached or answered with an error.
    #[error("transport: {0}")]
    Transport(String),
}

impl SignerError {
    /// Whether the error is a precondition the caller can fix, as opposed to an internal failure.
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            SignerError::NoPrivateKey { .. }
                | SignerError::InvalidKeyLength(_)
                | SignerError::InvalidDigestLength(_)
                | SignerError::UnsupportedNetworkType(_)
                | SignerError::UnknownKeyUsage(_)
        )
    }
}

/// Result alias for signer operations.
pub type SignerResult<T> = Result<T, SignerError>;
