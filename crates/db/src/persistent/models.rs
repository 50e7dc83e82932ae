//! Row models of the bridge tables and their conversion into domain types.

use chrono::{DateTime, Utc};

use super::{
    errors::StorageError,
    types::{DbAmount, DbTransferStatus},
};
use crate::{
    networks::{NetworkToken, Token},
    transfers::{TokenTransfer, Transaction},
};

fn network_id(value: i64) -> Result<u32, StorageError> {
    u32::try_from(value)
        .map_err(|_| StorageError::MismatchedTypes(format!("network id {value} out of range")))
}

fn unsigned(value: i64, what: &str) -> Result<u64, StorageError> {
    u64::try_from(value).map_err(|_| StorageError::MismatchedTypes(format!("negative {what}")))
}

/// A row of `tokens`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct TokenRow {
    pub(super) id: i64,
    pub(super) short_name: String,
    pub(super) long_name: String,
}

impl From<TokenRow> for Token {
    fn from(row: TokenRow) -> Self {
        Self {
            id: row.id,
            short_name: row.short_name,
            long_name: row.long_name,
        }
    }
}

/// A row of `network_tokens`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct NetworkTokenRow {
    pub(super) network_id: i64,
    pub(super) token_id: i64,
    pub(super) contract_address: Vec<u8>,
    pub(super) decimals: i64,
}

impl TryFrom<NetworkTokenRow> for NetworkToken {
    type Error = StorageError;

    fn try_from(row: NetworkTokenRow) -> Result<Self, Self::Error> {
        Ok(Self {
            network_id: network_id(row.network_id)?,
            token_id: row.token_id,
            contract_address: row.contract_address,
            decimals: u32::try_from(row.decimals).map_err(|_| {
                StorageError::MismatchedTypes(format!("decimals {} out of range", row.decimals))
            })?,
        })
    }
}

/// A row of `transactions`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct TransactionRow {
    pub(super) id: i64,
    pub(super) network_id: i64,
    pub(super) tx_hash: Vec<u8>,
    pub(super) sender: Vec<u8>,
    pub(super) block_number: i64,
    /// Unix time in milliseconds.
    pub(super) seen_at: i64,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StorageError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let seen_at = DateTime::<Utc>::from_timestamp_millis(row.seen_at).ok_or_else(|| {
            StorageError::MismatchedTypes(format!("timestamp {} out of range", row.seen_at))
        })?;

        Ok(Self {
            id: row.id,
            network_id: network_id(row.network_id)?,
            tx_hash: row.tx_hash,
            sender: row.sender,
            block_number: unsigned(row.block_number, "block number")?,
            seen_at,
        })
    }
}

/// A row of `token_transfers`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct TokenTransferRow {
    pub(super) id: i64,
    pub(super) triggering_tx: i64,
    pub(super) outbound_tx: Option<i64>,
    pub(super) token_id: i64,
    pub(super) amount: DbAmount,
    pub(super) status: DbTransferStatus,
    pub(super) sender_network_id: i64,
    pub(super) sender_address: Vec<u8>,
    pub(super) recipient_network_id: i64,
    pub(super) recipient_address: Vec<u8>,
}

impl TryFrom<TokenTransferRow> for TokenTransfer {
    type Error = StorageError;

    fn try_from(row: TokenTransferRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            triggering_tx: row.triggering_tx,
            outbound_tx: row.outbound_tx,
            token_id: row.token_id,
            amount: *row.amount,
            status: *row.status,
            sender_network_id: network_id(row.sender_network_id)?,
            sender_address: row.sender_address,
            recipient_network_id: network_id(row.recipient_network_id)?,
            recipient_address: row.recipient_address,
        })
    }
}
