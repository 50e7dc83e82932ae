//! Hashing primitives and per-chain signature verification.

pub mod casper;
pub mod evm;
pub mod solana;

use sha2::Sha256;
use sha3::{Digest, Keccak256};

use crate::{
    constants::{AUTH_MESSAGE_BODY, ETHEREUM_SIGNED_MESSAGE_PREFIX},
    errors::SignatureError,
    networks::NetworkType,
};

/// Length of a recoverable secp256k1 signature `(r, s, v)`.
pub const RECOVERABLE_SIGNATURE_LENGTH: usize = 65;

/// Length of a compact signature `(r, s)`.
pub const COMPACT_SIGNATURE_LENGTH: usize = 64;

/// Keccak-256 digest.
pub fn keccak256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Keccak256::digest(data.as_ref()).into()
}

/// SHA-256 digest.
pub fn sha256(data: impl AsRef<[u8]>) -> [u8; 32] {
    Sha256::digest(data.as_ref()).into()
}

/// BLAKE2b digest truncated to 32 bytes, as used for Casper hashes.
pub fn blake2b256(data: impl AsRef<[u8]>) -> [u8; 32] {
    let hash = blake2b_simd::Params::new()
        .hash_length(32)
        .hash(data.as_ref());

    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Digest of `data` wrapped in the Ethereum signed-message envelope.
pub fn eth_signed_message_hash(data: impl AsRef<[u8]>) -> [u8; 32] {
    let data = data.as_ref();
    let mut buf = Vec::with_capacity(ETHEREUM_SIGNED_MESSAGE_PREFIX.len() + 4 + data.len());
    buf.extend_from_slice(ETHEREUM_SIGNED_MESSAGE_PREFIX.as_bytes());
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(data);

    keccak256(buf)
}

/// Rewrites the recovery byte of a 65 byte signature from `{0, 1}` to `{27, 28}`.
pub fn to_evm_signature(signature: &[u8]) -> Result<Vec<u8>, SignatureError> {
    if signature.len() != RECOVERABLE_SIGNATURE_LENGTH {
        return Err(SignatureError::InvalidSignature(format!(
            "expected {RECOVERABLE_SIGNATURE_LENGTH} bytes, got {}",
            signature.len()
        )));
    }

    let mut out = signature.to_vec();
    out[64] = match out[64] {
        0 => 27,
        1 => 28,
        v => {
            return Err(SignatureError::InvalidSignature(format!(
                "unexpected recovery byte {v}"
            )))
        }
    };

    Ok(out)
}

/// Drops the trailing recovery byte of a signature, keeping at most 64 bytes.
pub fn without_v(signature: &[u8]) -> &[u8] {
    &signature[..signature.len().min(COMPACT_SIGNATURE_LENGTH)]
}

/// Checks a signature over the authentication proof and returns the address that made it.
///
/// EVM accounts are recovered from the signature alone. Casper and Solana wallets must present
/// the public key; Casper yields the `Key::Account` bytes of the key, Solana the key itself.
pub fn verify_auth_signature(
    network_type: NetworkType,
    signature: &[u8],
    public_key: Option<&[u8]>,
) -> Result<Vec<u8>, SignatureError> {
    let message = AUTH_MESSAGE_BODY.as_bytes();

    match network_type {
        NetworkType::Evm => evm::recover_address(signature, message).map(|a| a.to_vec()),
        NetworkType::Casper => {
            let public_key = public_key.ok_or(SignatureError::EmptyPublicKey)?;
            casper::verify(public_key, message, signature)?;
            casper::account_key(public_key)
        }
        NetworkType::Solana => {
            let public_key = public_key.ok_or(SignatureError::EmptyPublicKey)?;
            solana::verify(public_key, message, signature)?;
            Ok(public_key.to_vec())
        }
    }
}
