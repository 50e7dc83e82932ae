//! Casper account keys: signature verification and account hash derivation.

use secp256k1::{ecdsa::Signature, Message, PublicKey, SECP256K1};

use super::{blake2b256, sha256};
use crate::{
    constants::{
        CASPER_KEY_ACCOUNT_TAG, CASPER_MESSAGE_PREFIX, CASPER_TAG_ED25519, CASPER_TAG_SECP256K1,
    },
    errors::SignatureError,
};

/// Signature algorithm of a Casper account key, given by the first byte of the tagged key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Ed25519, tag `01`.
    Ed25519,
    /// secp256k1, tag `02`.
    Secp256k1,
}

impl Algorithm {
    /// Reads the algorithm from a tagged public key.
    pub fn of(public_key: &[u8]) -> Result<Self, SignatureError> {
        match public_key.first() {
            None => Err(SignatureError::EmptyPublicKey),
            Some(&CASPER_TAG_ED25519) => Ok(Algorithm::Ed25519),
            Some(&CASPER_TAG_SECP256K1) => Ok(Algorithm::Secp256k1),
            Some(_) => Err(SignatureError::InvalidAlgorithm),
        }
    }

    /// Tag byte prepended to public keys and signatures.
    pub const fn tag(&self) -> u8 {
        match self {
            Algorithm::Ed25519 => CASPER_TAG_ED25519,
            Algorithm::Secp256k1 => CASPER_TAG_SECP256K1,
        }
    }

    /// Name mixed into the account hash preimage.
    pub const fn name(&self) -> &'static str {
        match self {
            Algorithm::Ed25519 => "ed25519",
            Algorithm::Secp256k1 => "secp256k1",
        }
    }
}

fn casper_message(message: &[u8]) -> Vec<u8> {
    let mut data = CASPER_MESSAGE_PREFIX.as_bytes().to_vec();
    data.extend_from_slice(message);
    data
}

/// Verifies a wallet signature over `message` made by the tagged Casper `public_key`.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
    let algorithm = Algorithm::of(public_key)?;
    let data = casper_message(message);
    let key = &public_key[1..];

    match algorithm {
        Algorithm::Ed25519 => super::solana::verify(key, &data, signature),
        Algorithm::Secp256k1 => {
            let key = PublicKey::from_slice(key)
                .map_err(|e| SignatureError::MalformedKey(e.to_string()))?;
            let sig = Signature::from_compact(signature)
                .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;
            let digest = Message::from_digest(sha256(&data));

            SECP256K1
                .verify_ecdsa(&digest, &sig, &key)
                .map_err(|_| SignatureError::VerificationFailed)
        }
    }
}

/// Derives the account hash of a tagged Casper public key.
pub fn account_hash(public_key: &[u8]) -> Result<[u8; 32], SignatureError> {
    let algorithm = Algorithm::of(public_key)?;

    let mut preimage = algorithm.name().as_bytes().to_vec();
    preimage.push(0);
    preimage.extend_from_slice(&public_key[1..]);

    Ok(blake2b256(preimage))
}

/// Bytes of the `Key::Account` value owned by a tagged Casper public key.
pub fn account_key(public_key: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let mut key = vec![CASPER_KEY_ACCOUNT_TAG];
    key.extend_from_slice(&account_hash(public_key)?);
    Ok(key)
}
