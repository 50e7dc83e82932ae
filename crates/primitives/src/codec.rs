//! Encoding and validation of chain-native addresses and hashes.
//!
//! EVM and Casper values travel as hex, Solana values as base58. Hex strings coming from users may
//! carry one of the `0x`, `account-hash-` or `hash-` prefixes, which are stripped before decoding.

use crate::{
    constants::{
        CASPER_ADDRESS_LENGTH, CASPER_HASH_LENGTH, CASPER_KEY_HASH_TAG, CASPER_TAG_ED25519,
        CASPER_TAG_SECP256K1, EVM_ADDRESS_LENGTH, EVM_HASH_LENGTH,
    },
    errors::CodecError,
    networks::{Network, NetworkType},
};

const HEX_PREFIX: &str = "0x";
const ACCOUNT_HASH_PREFIX: &str = "account-hash-";
const HASH_PREFIX: &str = "hash-";

fn is_hex(s: &str) -> bool {
    s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix(HEX_PREFIX)
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Strips any of the hex prefixes accepted by [`string_to_bytes`].
pub fn strip_hex_prefixes(s: &str) -> &str {
    if let Some(rest) = s.strip_prefix(HEX_PREFIX) {
        return rest;
    }
    if let Some(rest) = s.strip_prefix(ACCOUNT_HASH_PREFIX) {
        return rest;
    }
    s.strip_prefix(HASH_PREFIX).unwrap_or(s)
}

fn decode_hex(s: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(s).map_err(|e| CodecError::MalformedEncoding(format!("{s}: {e}")))
}

fn decode_base58(s: &str) -> Result<Vec<u8>, CodecError> {
    bs58::decode(s)
        .into_vec()
        .map_err(|e| CodecError::MalformedEncoding(format!("{s}: {e}")))
}

/// Checks an EVM account address: optional `0x` followed by 40 hex characters.
pub fn is_evm_address(s: &str) -> bool {
    let s = strip_0x(s);
    s.len() == 2 * EVM_ADDRESS_LENGTH && is_hex(s)
}

/// Checks a Casper public key: a `01` or `02` algorithm tag followed by 64 hex characters.
pub fn is_casper_address(s: &str) -> bool {
    let Some(tag) = s.get(..2) else {
        return false;
    };
    let tagged = [
        format!("{CASPER_TAG_ED25519:02x}"),
        format!("{CASPER_TAG_SECP256K1:02x}"),
    ];
    if !tagged.iter().any(|t| t == tag) {
        return false;
    }

    let key = &s[2..];
    key.len() == 2 * CASPER_ADDRESS_LENGTH && is_hex(key)
}

/// Checks an EVM transaction or block hash: optional `0x` followed by 64 hex characters.
pub fn is_evm_hash(s: &str) -> bool {
    let s = strip_0x(s);
    s.len() == 2 * EVM_HASH_LENGTH && is_hex(s)
}

/// Checks a Casper deploy or block hash: exactly 64 hex characters.
pub fn is_casper_hash(s: &str) -> bool {
    s.len() == 2 * CASPER_HASH_LENGTH && is_hex(s)
}

fn is_base58(s: &str) -> bool {
    bs58::decode(s).into_vec().is_ok()
}

/// Validates an address or public key on the given network family.
pub fn is_address_valid(network_type: NetworkType, address: &str) -> bool {
    match network_type {
        NetworkType::Evm => is_evm_address(address),
        NetworkType::Casper => is_casper_address(address),
        NetworkType::Solana => is_base58(address),
    }
}

/// Decodes an address or public key on the given network family to raw bytes.
///
/// Casper keys keep their algorithm tag.
pub fn decode_address(network_type: NetworkType, address: &str) -> Result<Vec<u8>, CodecError> {
    let invalid = || CodecError::InvalidAddress {
        network_type,
        address: address.to_owned(),
    };

    match network_type {
        NetworkType::Evm => {
            if !is_evm_address(address) {
                return Err(invalid());
            }
            decode_hex(strip_0x(address))
        }
        NetworkType::Casper => {
            if !is_casper_address(address) {
                return Err(invalid());
            }
            decode_hex(address)
        }
        NetworkType::Solana => decode_base58(address).map_err(|_| invalid()),
    }
}

/// Decodes a transaction, deploy or block hash on the given network family to raw bytes.
pub fn decode_hash(network_type: NetworkType, hash: &str) -> Result<Vec<u8>, CodecError> {
    let invalid = || CodecError::InvalidHash {
        network_type,
        hash: hash.to_owned(),
    };

    match network_type {
        NetworkType::Evm => {
            if !is_evm_hash(hash) {
                return Err(invalid());
            }
            decode_hex(strip_0x(hash))
        }
        NetworkType::Casper => {
            if !is_casper_hash(hash) {
                return Err(invalid());
            }
            decode_hex(hash)
        }
        NetworkType::Solana => decode_base58(hash).map_err(|_| invalid()),
    }
}

/// Parses a network type given by name.
pub fn parse_network_type(s: &str) -> Result<NetworkType, CodecError> {
    s.parse()
}

/// Converts a user-supplied signature, public key, hash or address to bytes for the given network.
pub fn string_to_bytes(network: Network, s: &str) -> Result<Vec<u8>, CodecError> {
    match network.network_type() {
        NetworkType::Solana => decode_base58(s),
        NetworkType::Evm | NetworkType::Casper => decode_hex(strip_hex_prefixes(s)),
    }
}

/// Inverse of [`string_to_bytes`]: renders bytes in the canonical encoding of the network.
pub fn bytes_to_string(network: Network, bytes: &[u8]) -> String {
    match network.network_type() {
        NetworkType::Solana => bs58::encode(bytes).into_string(),
        NetworkType::Evm | NetworkType::Casper => hex::encode(bytes),
    }
}

/// Canonical form of a token contract address on a network.
///
/// Casper events report contract hashes with a leading `Key::Hash` tag, while the token registry
/// stores the bare 32 byte hash.
pub fn canonical_contract(network: Network, contract: &[u8]) -> &[u8] {
    match network.network_type() {
        NetworkType::Casper
            if contract.len() == CASPER_HASH_LENGTH + 1 && contract[0] == CASPER_KEY_HASH_TAG =>
        {
            &contract[1..]
        }
        _ => contract,
    }
}
