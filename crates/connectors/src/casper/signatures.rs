//! Payloads users present to the Casper bridge contract.

use ethnum::U256;
use tricorn_primitives::{
    crypto::{sha256, without_v},
    networks::NetworkType,
};
use tricorn_signer::{BridgeSigner, KeyUsage};

use crate::errors::ConnectorResult;

/// Appends the minimal little endian bytes of `value`, preceded by their count.
///
/// The count itself is written as minimal big endian bytes, so zero values contribute nothing.
fn push_with_len(out: &mut Vec<u8>, value: U256) {
    let le = value.to_le_bytes();
    let len = le.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    if len > 0 {
        out.push(len as u8);
        out.extend_from_slice(&le[..len]);
    }
}

/// Fields bound by a BridgeIn signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInPayload<'a> {
    /// Domain prefix.
    pub prefix: &'a str,
    /// Bridge contract hash.
    pub bridge_hash: &'a [u8],
    /// Token contract package hash.
    pub token_package_hash: &'a [u8],
    /// Account of the user that will call `bridge_in`.
    pub account: &'a [u8],
    /// Locked amount.
    pub amount: U256,
    /// Commission withheld for gas on the destination chain.
    pub gas_commission: U256,
    /// Unix time in milliseconds after which the signature expires.
    pub deadline: U256,
    /// Bridge nonce.
    pub nonce: U256,
    /// Destination network name.
    pub destination_chain: &'a str,
    /// Destination address.
    pub destination_address: &'a str,
}

impl BridgeInPayload<'_> {
    /// Byte string the contract hashes.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = self.prefix.as_bytes().to_vec();
        data.extend_from_slice(self.bridge_hash);
        data.extend_from_slice(self.token_package_hash);
        data.extend_from_slice(self.account);
        push_with_len(&mut data, self.amount);
        push_with_len(&mut data, self.gas_commission);
        push_with_len(&mut data, self.deadline);
        push_with_len(&mut data, self.nonce);
        data.extend_from_slice(self.destination_chain.as_bytes());
        data.extend_from_slice(self.destination_address.as_bytes());
        data
    }
}

/// Fields bound by a transfer out (cancel) signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutPayload<'a> {
    /// Domain prefix.
    pub prefix: &'a str,
    /// Bridge contract hash.
    pub bridge_hash: &'a [u8],
    /// Token contract package hash.
    pub token_package_hash: &'a [u8],
    /// Account allowed to withdraw.
    pub account: &'a [u8],
    /// Account hash of the recipient, may be empty.
    pub recipient: &'a [u8],
    /// Refunded amount.
    pub amount: U256,
    /// Commission withheld from the refund.
    pub commission: U256,
    /// Bridge nonce.
    pub nonce: U256,
}

impl TransferOutPayload<'_> {
    /// Byte string the contract hashes.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = self.prefix.as_bytes().to_vec();
        data.extend_from_slice(self.bridge_hash);
        data.extend_from_slice(self.token_package_hash);
        data.extend_from_slice(self.account);
        // account tag of the recipient key.
        data.push(0);
        data.extend_from_slice(self.recipient);
        push_with_len(&mut data, self.amount);
        push_with_len(&mut data, self.commission);
        push_with_len(&mut data, self.nonce);
        data
    }
}

/// Signs a payload the way the Casper contract verifies it: SHA-256 and no recovery id.
pub async fn sign_payload(signer: &dyn BridgeSigner, payload: &[u8]) -> ConnectorResult<Vec<u8>> {
    let digest = sha256(payload);
    let signature = signer
        .sign(NetworkType::Casper, &digest, KeyUsage::Signature)
        .await?;

    Ok(without_v(&signature).to_vec())
}
