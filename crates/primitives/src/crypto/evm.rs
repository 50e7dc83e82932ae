//! Recovery of EVM accounts from user signatures.

use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SECP256K1,
};

use super::{eth_signed_message_hash, keccak256, RECOVERABLE_SIGNATURE_LENGTH};
use crate::{constants::EVM_ADDRESS_LENGTH, errors::SignatureError};

/// Derives the EVM address of an uncompressed public key given as the 64 byte `X || Y`.
pub fn address_from_public_key(xy: &[u8]) -> Result<[u8; EVM_ADDRESS_LENGTH], SignatureError> {
    if xy.len() != 64 {
        return Err(SignatureError::MalformedKey(format!(
            "expected 64 byte public key, got {}",
            xy.len()
        )));
    }

    let hash = keccak256(xy);
    let mut address = [0u8; EVM_ADDRESS_LENGTH];
    address.copy_from_slice(&hash[32 - EVM_ADDRESS_LENGTH..]);
    Ok(address)
}

/// Serializes a public key as the 64 byte `X || Y` concatenation.
pub fn public_key_xy(public_key: &PublicKey) -> [u8; 64] {
    let mut xy = [0u8; 64];
    xy.copy_from_slice(&public_key.serialize_uncompressed()[1..]);
    xy
}

/// Recovers the public key that produced `signature` over the signed-message envelope of `message`.
///
/// The recovery byte may be given either as `{0, 1}` or `{27, 28}`.
pub fn recover_public_key(signature: &[u8], message: &[u8]) -> Result<PublicKey, SignatureError> {
    if signature.len() != RECOVERABLE_SIGNATURE_LENGTH {
        return Err(SignatureError::InvalidSignature(
            "invalid signature len, should be 65".to_owned(),
        ));
    }

    let v = match signature[64] {
        v @ (27 | 28) => v - 27,
        v => v,
    };
    let rec_id = RecoveryId::from_i32(i32::from(v))
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;
    let sig = RecoverableSignature::from_compact(&signature[..64], rec_id)
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;

    let digest = Message::from_digest(eth_signed_message_hash(message));
    SECP256K1
        .recover_ecdsa(&digest, &sig)
        .map_err(|_| SignatureError::VerificationFailed)
}

/// Recovers the address of the account that signed `message`.
pub fn recover_address(
    signature: &[u8],
    message: &[u8],
) -> Result<[u8; EVM_ADDRESS_LENGTH], SignatureError> {
    let public_key = recover_public_key(signature, message)?;
    address_from_public_key(&public_key_xy(&public_key))
}
