//! Signatures produced for the EVM bridge contract and its transactions.

use alloy::{
    primitives::{Address, Signature, U256},
    sol_types::SolValue,
};
use tricorn_primitives::{
    crypto::{eth_signed_message_hash, keccak256, to_evm_signature, RECOVERABLE_SIGNATURE_LENGTH},
    networks::NetworkType,
};
use tricorn_signer::{BridgeSigner, KeyUsage};

use crate::errors::{ConnectorError, ConnectorResult};

/// Fields bound by a BridgeIn signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInPayload<'a> {
    /// Caller of `bridgeIn`.
    pub user: Address,
    /// Locked token.
    pub token: Address,
    /// Locked amount.
    pub amount: U256,
    /// Gas commission withheld on the destination.
    pub gas_commission: U256,
    /// Destination network name.
    pub destination_chain: &'a str,
    /// Destination address.
    pub destination_address: &'a str,
    /// Unix time in seconds after which the signature expires.
    pub deadline: U256,
    /// Bridge nonce.
    pub nonce: U256,
}

impl BridgeInPayload<'_> {
    /// Packed encoding the contract hashes.
    pub fn encode(&self) -> Vec<u8> {
        (
            self.user,
            self.token,
            self.amount,
            self.gas_commission,
            self.destination_chain.to_string(),
            self.destination_address.to_string(),
            self.deadline,
            self.nonce,
        )
            .abi_encode_packed()
    }
}

/// Fields bound by a cancel (transfer out) signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelPayload {
    /// Refunded token.
    pub token: Address,
    /// Refund recipient.
    pub recipient: Address,
    /// Refunded amount.
    pub amount: U256,
    /// Commission withheld from the refund.
    pub commission: U256,
    /// Bridge nonce.
    pub nonce: U256,
}

impl CancelPayload {
    /// Packed encoding the contract hashes.
    pub fn encode(&self) -> Vec<u8> {
        (
            self.token,
            self.recipient,
            self.amount,
            self.commission,
            self.nonce,
        )
            .abi_encode_packed()
    }
}

/// Signs a packed payload the way the contract verifies it: keccak, then the signed message
/// envelope, with `v` shifted to 27/28.
pub async fn sign_packed(signer: &dyn BridgeSigner, payload: &[u8]) -> ConnectorResult<Vec<u8>> {
    let digest = eth_signed_message_hash(keccak256(payload));
    let signature = signer
        .sign(NetworkType::Evm, &digest, KeyUsage::Signature)
        .await?;

    Ok(to_evm_signature(&signature)?)
}

/// Reads the signer's `r || s || v` output over a transaction digest, `v ∈ {0, 1}`.
pub fn transaction_signature(raw: &[u8]) -> ConnectorResult<Signature> {
    if raw.len() != RECOVERABLE_SIGNATURE_LENGTH || raw[64] > 1 {
        return Err(ConnectorError::UnexpectedResponse(format!(
            "signer returned an unusable transaction signature of {} bytes",
            raw.len()
        )));
    }

    Ok(Signature::new(
        U256::from_be_slice(&raw[..32]),
        U256::from_be_slice(&raw[32..64]),
        raw[64] == 1,
    ))
}
