//! Signature production.

use std::fmt::Debug;

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use secp256k1::{Message, PublicKey, SecretKey, SECP256K1};
use tracing::{debug, trace};
use tricorn_primitives::{crypto::evm::public_key_xy, networks::NetworkType};

use crate::{
    errors::{SignerError, SignerResult},
    keystore::KeyStore,
    usage::KeyUsage,
};

const SECP256K1_KEY_LENGTH: usize = 32;
const ED25519_SEED_LENGTH: usize = 32;
const ED25519_KEYPAIR_LENGTH: usize = 64;

/// Capability to sign on behalf of the bridge.
///
/// Connectors and the orchestrator only ever see this trait, never key material.
#[async_trait]
pub trait BridgeSigner: Debug + Send + Sync {
    /// Signs `data` with the key stored for `(network_type, usage)`.
    ///
    /// secp256k1 schemes expect `data` to be a 32 byte digest and return `r || s || v` with
    /// `v ∈ {0, 1}`. Ed25519 schemes sign `data` as is and return 64 bytes.
    async fn sign(
        &self,
        network_type: NetworkType,
        data: &[u8],
        usage: KeyUsage,
    ) -> SignerResult<Vec<u8>>;

    /// Returns the chain-native public key of the transaction key of `network_type`.
    async fn public_key(&self, network_type: NetworkType) -> SignerResult<Vec<u8>>;
}

/// Signs with keys read from a [`KeyStore`].
#[derive(Debug, Clone)]
pub struct SignerService<K> {
    store: K,
}

impl<K: KeyStore> SignerService<K> {
    /// Creates a service over the given keystore.
    pub fn new(store: K) -> Self {
        Self { store }
    }

    /// Returns the underlying keystore.
    pub fn store(&self) -> &K {
        &self.store
    }

    async fn key_bytes(&self, network_type: NetworkType, usage: KeyUsage) -> SignerResult<Vec<u8>> {
        let key_hex = self.store.private_key(network_type, usage).await?;
        hex::decode(key_hex.trim()).map_err(|e| SignerError::InvalidKeyMaterial(e.to_string()))
    }
}

fn secret_key(key: &[u8]) -> SignerResult<SecretKey> {
    SecretKey::from_slice(key).map_err(|e| SignerError::InvalidKeyMaterial(e.to_string()))
}

fn ed25519_key(key: &[u8]) -> SignerResult<SigningKey> {
    let seed: [u8; ED25519_SEED_LENGTH] = match key.len() {
        ED25519_SEED_LENGTH | ED25519_KEYPAIR_LENGTH => key[..ED25519_SEED_LENGTH]
            .try_into()
            .map_err(|_| SignerError::InvalidKeyLength(key.len()))?,
        len => return Err(SignerError::InvalidKeyLength(len)),
    };

    Ok(SigningKey::from_bytes(&seed))
}

fn sign_secp256k1(key: &[u8], digest: &[u8]) -> SignerResult<Vec<u8>> {
    let digest: [u8; 32] = digest
        .try_into()
        .map_err(|_| SignerError::InvalidDigestLength(digest.len()))?;
    let key = secret_key(key)?;

    let signature = SECP256K1.sign_ecdsa_recoverable(&Message::from_digest(digest), &key);
    let (rec_id, compact) = signature.serialize_compact();

    let mut out = compact.to_vec();
    // recovery ids are always in 0..=3.
    out.push(rec_id.to_i32() as u8);
    Ok(out)
}

fn sign_ed25519(key: &[u8], data: &[u8]) -> SignerResult<Vec<u8>> {
    Ok(ed25519_key(key)?.sign(data).to_bytes().to_vec())
}

#[async_trait]
impl<K: KeyStore> BridgeSigner for SignerService<K> {
    async fn sign(
        &self,
        network_type: NetworkType,
        data: &[u8],
        usage: KeyUsage,
    ) -> SignerResult<Vec<u8>> {
        let key = self.key_bytes(network_type, usage).await?;
        trace!(%network_type, %usage, len = data.len(), "signing");

        let signature = match network_type {
            NetworkType::Evm => sign_secp256k1(&key, data)?,
            NetworkType::Casper => match key.len() {
                ED25519_KEYPAIR_LENGTH => sign_ed25519(&key, data)?,
                SECP256K1_KEY_LENGTH => sign_secp256k1(&key, data)?,
                len => return Err(SignerError::InvalidKeyLength(len)),
            },
            NetworkType::Solana => sign_ed25519(&key, data)?,
        };

        debug!(%network_type, %usage, "produced signature");
        Ok(signature)
    }

    async fn public_key(&self, network_type: NetworkType) -> SignerResult<Vec<u8>> {
        let key = self.key_bytes(network_type, KeyUsage::Transaction).await?;

        match network_type {
            NetworkType::Evm => {
                let public_key = PublicKey::from_secret_key_global(&secret_key(&key)?);
                Ok(public_key_xy(&public_key).to_vec())
            }
            NetworkType::Casper => match key.len() {
                ED25519_KEYPAIR_LENGTH => Ok(ed25519_key(&key)?.verifying_key().to_bytes().to_vec()),
                SECP256K1_KEY_LENGTH => {
                    let public_key = PublicKey::from_secret_key_global(&secret_key(&key)?);
                    Ok(public_key.serialize().to_vec())
                }
                len => Err(SignerError::InvalidKeyLength(len)),
            },
            NetworkType::Solana => Ok(ed25519_key(&key)?.verifying_key().to_bytes().to_vec()),
        }
    }
}
