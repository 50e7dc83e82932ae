//! Observed transactions and the transfers they trigger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethnum::U256;
use tricorn_primitives::transfer::TransferStatus;

use crate::errors::DbResult;

/// A transaction about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Network the transaction was observed on.
    pub network_id: u32,
    /// Hash in the network's byte encoding.
    pub tx_hash: Vec<u8>,
    /// Account that sent the transaction.
    pub sender: Vec<u8>,
    /// Block that included the transaction, 0 for our own submissions.
    pub block_number: u64,
    /// When the bridge first saw the transaction.
    pub seen_at: DateTime<Utc>,
}

/// A recorded transaction.
///
/// `(network_id, tx_hash)` is unique: recording the same pair twice keeps the first row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Row id.
    pub id: i64,
    /// Network the transaction was observed on.
    pub network_id: u32,
    /// Hash in the network's byte encoding.
    pub tx_hash: Vec<u8>,
    /// Account that sent the transaction.
    pub sender: Vec<u8>,
    /// Block that included the transaction.
    pub block_number: u64,
    /// When the bridge first saw the transaction.
    pub seen_at: DateTime<Utc>,
}

/// The transfer part of a deposit, recorded together with its triggering transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeposit {
    /// Registry id of the moved token.
    pub token_id: i64,
    /// Moved amount in base units.
    pub amount: U256,
    /// Source network.
    pub sender_network_id: u32,
    /// Address that locked the tokens.
    pub sender_address: Vec<u8>,
    /// Destination network.
    pub recipient_network_id: u32,
    /// Address that receives the tokens.
    pub recipient_address: Vec<u8>,
}

/// A cross-chain transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    /// Row id.
    pub id: i64,
    /// Transaction that locked the funds on the source network.
    pub triggering_tx: i64,
    /// Transaction that released the funds on the destination network, once known.
    pub outbound_tx: Option<i64>,
    /// Registry id of the moved token.
    pub token_id: i64,
    /// Moved amount in base units.
    pub amount: U256,
    /// Lifecycle status.
    pub status: TransferStatus,
    /// Source network.
    pub sender_network_id: u32,
    /// Address that locked the tokens.
    pub sender_address: Vec<u8>,
    /// Destination network.
    pub recipient_network_id: u32,
    /// Address that receives the tokens.
    pub recipient_address: Vec<u8>,
}

/// What a release observed on a destination network tells about its transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferMatch {
    /// Released amount.
    pub amount: U256,
    /// Network the transfer came from.
    pub sender_network_id: u32,
    /// Address that locked the tokens.
    pub sender_address: Vec<u8>,
    /// Network the release happened on.
    pub recipient_network_id: u32,
    /// Address that received the tokens.
    pub recipient_address: Vec<u8>,
}

/// Transactions the bridge has observed or submitted.
#[async_trait]
pub trait TransactionDb {
    /// Records a transaction and returns its id, or `None` if `(network_id, tx_hash)` was already
    /// recorded.
    async fn insert_transaction(&self, tx: &NewTransaction) -> DbResult<Option<i64>>;

    /// Looks a transaction up by id.
    async fn transaction(&self, id: i64) -> DbResult<Option<Transaction>>;

    /// Looks a transaction up by network and hash.
    async fn transaction_by_hash(
        &self,
        network_id: u32,
        tx_hash: &[u8],
    ) -> DbResult<Option<Transaction>>;
}

/// Transfers and their status transitions.
///
/// Every transition is conditional on the current status. Methods that move a transfer return
/// `false` when the transfer is missing or not in the expected status, leaving the row untouched.
#[async_trait]
pub trait TokenTransferDb {
    /// Atomically records a deposit transaction and the `WAITING` transfer it triggers.
    ///
    /// Returns `None` without writing anything if the transaction was already recorded.
    async fn record_deposit(
        &self,
        tx: &NewTransaction,
        deposit: &NewDeposit,
    ) -> DbResult<Option<TokenTransfer>>;

    /// Looks a transfer up by id.
    async fn transfer(&self, id: i64) -> DbResult<Option<TokenTransfer>>;

    /// Looks up the transfer triggered by the given transaction.
    async fn transfer_by_triggering_tx(
        &self,
        network_id: u32,
        tx_hash: &[u8],
    ) -> DbResult<Option<TokenTransfer>>;

    /// Looks up the transfer whose outbound transaction is `tx_id`.
    async fn transfer_by_outbound_tx(&self, tx_id: i64) -> DbResult<Option<TokenTransfer>>;

    /// Returns the newest `CONFIRMING` transfer matching a release.
    async fn latest_confirming_transfer(
        &self,
        release: &TransferMatch,
    ) -> DbResult<Option<TokenTransfer>>;

    /// Atomically records the outbound transaction of a `WAITING` transfer and moves it to
    /// `CONFIRMING`.
    async fn confirm_transfer(&self, id: i64, outbound: &NewTransaction) -> DbResult<bool>;

    /// Moves a `CONFIRMING` transfer to `FINISHED`, binding the observed release transaction.
    async fn finish_transfer(&self, id: i64, outbound_tx: i64) -> DbResult<bool>;

    /// Moves a transfer from `from` to `to`.
    ///
    /// Transitions that [`TransferStatus::can_transition_to`] rejects fail with
    /// [`StorageError::InvalidData`](crate::persistent::errors::StorageError::InvalidData).
    async fn update_transfer_status(
        &self,
        id: i64,
        from: TransferStatus,
        to: TransferStatus,
    ) -> DbResult<bool>;

    /// Pages through the transfers sent by a user, newest first.
    async fn transfers_by_sender(
        &self,
        network_id: u32,
        sender_address: &[u8],
        offset: u64,
        limit: u64,
    ) -> DbResult<Vec<TokenTransfer>>;

    /// Counts the transfers sent by a user.
    async fn count_transfers_by_sender(
        &self,
        network_id: u32,
        sender_address: &[u8],
    ) -> DbResult<u64>;
}
