//! SQLite implementation of the bridge store.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tokio::time::sleep;
use tracing::{debug, warn};
use tricorn_primitives::transfer::TransferStatus;

use super::{
    config::DbConfig,
    errors::StorageError,
    models::{NetworkTokenRow, TokenRow, TokenTransferRow, TransactionRow},
    types::{DbAmount, DbTransferStatus},
};
use crate::{
    errors::{DbError, DbResult},
    networks::{NetworkBlockDb, NetworkToken, NetworkTokenDb, NonceDb, Token, TokenDb},
    transfers::{
        NewDeposit, NewTransaction, TokenTransfer, TokenTransferDb, Transaction, TransactionDb,
        TransferMatch,
    },
};

/// Columns of `token_transfers`, for queries that alias the table as `tt`.
const TRANSFER_COLUMNS: &str = "tt.id, tt.triggering_tx, tt.outbound_tx, tt.token_id, tt.amount, \
     tt.status, tt.sender_network_id, tt.sender_address, tt.recipient_network_id, \
     tt.recipient_address";

/// Runs `operation` until it succeeds, fails with a non-transient error or exhausts the retries
/// allowed by `config`.
///
/// Only lock conflicts and pool timeouts are retried, see [`DbError::is_transient`].
pub async fn execute_with_retries<F, Fut, T>(config: &DbConfig, mut operation: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Err(err) if err.is_transient() && attempt < config.max_retry_count() => {
                attempt += 1;
                warn!(%err, %attempt, "database is busy, retrying");

                sleep(config.backoff_period()).await;
            }
            result => return result,
        }
    }
}

/// Selects transfers matching `filter`, newest first.
fn transfer_query(filter: &str) -> String {
    format!(
        "SELECT {TRANSFER_COLUMNS} FROM token_transfers AS tt
            LEFT JOIN transactions AS txt ON tt.triggering_tx = txt.id
            WHERE {filter}
            ORDER BY tt.id DESC"
    )
}

fn to_i64(value: u64, what: &str) -> Result<i64, StorageError> {
    i64::try_from(value)
        .map_err(|_| StorageError::MismatchedTypes(format!("{what} {value} exceeds i64")))
}

fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Inserts a transaction unless its `(network_id, tx_hash)` is already recorded.
async fn insert_transaction_in(
    conn: &mut SqliteConnection,
    tx: &NewTransaction,
) -> DbResult<Option<i64>> {
    let row = sqlx::query(
        "INSERT INTO transactions (network_id, tx_hash, sender, block_number, seen_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (network_id, tx_hash) DO NOTHING
            RETURNING id",
    )
    .bind(tx.network_id)
    .bind(tx.tx_hash.as_slice())
    .bind(tx.sender.as_slice())
    .bind(to_i64(tx.block_number, "block number")?)
    .bind(to_millis(tx.seen_at))
    .fetch_optional(&mut *conn)
    .await
    .map_err(StorageError::from)?;

    match row {
        Some(row) => Ok(Some(row.try_get("id").map_err(StorageError::from)?)),
        None => Ok(None),
    }
}

async fn next_nonce_once(pool: &SqlitePool, network_id: u32) -> DbResult<i64> {
    let row = sqlx::query(
        "INSERT INTO nonces (network_id, nonce) VALUES ($1, 1)
            ON CONFLICT (network_id) DO UPDATE SET nonce = nonce + 1
            RETURNING nonce",
    )
    .bind(network_id)
    .fetch_one(pool)
    .await
    .map_err(StorageError::from)?;

    Ok(row.try_get("nonce").map_err(StorageError::from)?)
}

async fn set_last_seen_block_once(pool: &SqlitePool, network_id: u32, block: i64) -> DbResult<()> {
    let mut tx = pool.begin().await.map_err(StorageError::from)?;

    sqlx::query(
        "INSERT INTO network_blocks (network_id, last_seen_block) VALUES ($1, $2)
            ON CONFLICT (network_id) DO UPDATE SET last_seen_block = excluded.last_seen_block",
    )
    .bind(network_id)
    .bind(block)
    .execute(&mut *tx)
    .await
    .map_err(StorageError::from)?;

    tx.commit().await.map_err(StorageError::from)?;

    Ok(())
}

async fn insert_transaction_once(pool: &SqlitePool, tx: &NewTransaction) -> DbResult<Option<i64>> {
    let mut conn = pool.acquire().await.map_err(StorageError::from)?;

    insert_transaction_in(&mut conn, tx).await
}

async fn record_deposit_once(
    pool: &SqlitePool,
    tx: &NewTransaction,
    deposit: &NewDeposit,
) -> DbResult<Option<TokenTransfer>> {
    let mut db_tx = pool.begin().await.map_err(StorageError::from)?;

    let Some(triggering_tx) = insert_transaction_in(&mut db_tx, tx).await? else {
        return Ok(None);
    };

    let row = sqlx::query_as::<_, TokenTransferRow>(
        "INSERT INTO token_transfers (triggering_tx, outbound_tx, token_id, amount, status,
                sender_network_id, sender_address, recipient_network_id, recipient_address)
            VALUES ($1, NULL, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *",
    )
    .bind(triggering_tx)
    .bind(deposit.token_id)
    .bind(DbAmount::from(deposit.amount))
    .bind(DbTransferStatus::from(TransferStatus::Waiting))
    .bind(deposit.sender_network_id)
    .bind(deposit.sender_address.as_slice())
    .bind(deposit.recipient_network_id)
    .bind(deposit.recipient_address.as_slice())
    .fetch_one(&mut *db_tx)
    .await
    .map_err(StorageError::from)?;

    db_tx.commit().await.map_err(StorageError::from)?;

    Ok(Some(row.try_into()?))
}

async fn confirm_transfer_once(
    pool: &SqlitePool,
    id: i64,
    outbound: &NewTransaction,
) -> DbResult<bool> {
    let mut db_tx = pool.begin().await.map_err(StorageError::from)?;

    let outbound_tx = match insert_transaction_in(&mut db_tx, outbound).await? {
        Some(outbound_tx) => outbound_tx,
        None => sqlx::query("SELECT id FROM transactions WHERE network_id = $1 AND tx_hash = $2")
            .bind(outbound.network_id)
            .bind(outbound.tx_hash.as_slice())
            .fetch_one(&mut *db_tx)
            .await
            .and_then(|row| row.try_get::<i64, _>("id"))
            .map_err(StorageError::from)?,
    };

    let updated = sqlx::query(
        "UPDATE token_transfers SET status = $1, outbound_tx = $2 WHERE id = $3 AND status = $4",
    )
    .bind(DbTransferStatus::from(TransferStatus::Confirming))
    .bind(outbound_tx)
    .bind(id)
    .bind(DbTransferStatus::from(TransferStatus::Waiting))
    .execute(&mut *db_tx)
    .await
    .map_err(StorageError::from)?
    .rows_affected();

    if updated == 0 {
        return Ok(false);
    }

    db_tx.commit().await.map_err(StorageError::from)?;

    Ok(true)
}

async fn move_transfer_once(
    pool: &SqlitePool,
    id: i64,
    from: TransferStatus,
    to: TransferStatus,
    outbound_tx: Option<i64>,
) -> DbResult<bool> {
    let mut db_tx = pool.begin().await.map_err(StorageError::from)?;

    let updated = sqlx::query(
        "UPDATE token_transfers SET status = $1, outbound_tx = COALESCE($2, outbound_tx)
            WHERE id = $3 AND status = $4",
    )
    .bind(DbTransferStatus::from(to))
    .bind(outbound_tx)
    .bind(id)
    .bind(DbTransferStatus::from(from))
    .execute(&mut *db_tx)
    .await
    .map_err(StorageError::from)?
    .rows_affected();

    db_tx.commit().await.map_err(StorageError::from)?;

    Ok(updated > 0)
}

/// The bridge store on top of a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
    config: DbConfig,
}

impl SqliteDb {
    /// Wraps a pool whose database has been migrated with [`MIGRATOR`](crate::MIGRATOR).
    pub fn new(pool: SqlitePool, config: DbConfig) -> Self {
        Self { pool, config }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the retry policy of the store.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }
}

#[async_trait]
impl NonceDb for SqliteDb {
    async fn next_nonce(&self, network_id: u32) -> DbResult<u64> {
        let pool = &self.pool;
        let nonce = execute_with_retries(&self.config, || next_nonce_once(pool, network_id)).await?;

        debug!(%network_id, %nonce, "allocated nonce");

        Ok(u64::try_from(nonce)
            .map_err(|_| StorageError::MismatchedTypes(format!("negative nonce {nonce}")))?)
    }

    async fn current_nonce(&self, network_id: u32) -> DbResult<u64> {
        let nonce: Option<i64> = sqlx::query("SELECT nonce FROM nonces WHERE network_id = $1")
            .bind(network_id)
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.map(|row| row.try_get("nonce")).transpose())
            .map_err(StorageError::from)?;

        let nonce = nonce.unwrap_or_default();
        Ok(u64::try_from(nonce)
            .map_err(|_| StorageError::MismatchedTypes(format!("negative nonce {nonce}")))?)
    }
}

#[async_trait]
impl NetworkBlockDb for SqliteDb {
    async fn last_seen_block(&self, network_id: u32) -> DbResult<Option<u64>> {
        let block: Option<i64> =
            sqlx::query("SELECT last_seen_block FROM network_blocks WHERE network_id = $1")
                .bind(network_id)
                .fetch_optional(&self.pool)
                .await
                .and_then(|row| row.map(|row| row.try_get("last_seen_block")).transpose())
                .map_err(StorageError::from)?;

        block
            .map(|block| {
                u64::try_from(block).map_err(|_| {
                    DbError::from(StorageError::MismatchedTypes(format!(
                        "negative block {block}"
                    )))
                })
            })
            .transpose()
    }

    async fn set_last_seen_block(&self, network_id: u32, block: u64) -> DbResult<()> {
        let pool = &self.pool;
        let block = to_i64(block, "block number")?;

        execute_with_retries(&self.config, || {
            set_last_seen_block_once(pool, network_id, block)
        })
        .await
    }
}

#[async_trait]
impl TokenDb for SqliteDb {
    async fn create_token(&self, short_name: &str, long_name: &str) -> DbResult<i64> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let id: i64 =
            sqlx::query("INSERT INTO tokens (short_name, long_name) VALUES ($1, $2) RETURNING id")
                .bind(short_name)
                .bind(long_name)
                .fetch_one(&mut *tx)
                .await
                .and_then(|row| row.try_get("id"))
                .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;

        Ok(id)
    }

    async fn token(&self, id: i64) -> DbResult<Option<Token>> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT id, short_name, long_name FROM tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(Token::from))
    }

    async fn tokens_on_network(&self, network_id: u32) -> DbResult<Vec<Token>> {
        let rows = sqlx::query_as::<_, TokenRow>(
            "SELECT t.id, t.short_name, t.long_name FROM tokens AS t
                INNER JOIN network_tokens AS nt ON nt.token_id = t.id
                WHERE nt.network_id = $1
                ORDER BY t.id",
        )
        .bind(network_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(Token::from).collect())
    }
}

#[async_trait]
impl NetworkTokenDb for SqliteDb {
    async fn put_network_token(&self, network_token: &NetworkToken) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        sqlx::query(
            "INSERT OR REPLACE INTO network_tokens (network_id, token_id, contract_address, decimals)
                VALUES ($1, $2, $3, $4)",
        )
        .bind(network_token.network_id)
        .bind(network_token.token_id)
        .bind(network_token.contract_address.as_slice())
        .bind(network_token.decimals)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;

        Ok(())
    }

    async fn network_token(
        &self,
        network_id: u32,
        token_id: i64,
    ) -> DbResult<Option<NetworkToken>> {
        let row = sqlx::query_as::<_, NetworkTokenRow>(
            "SELECT network_id, token_id, contract_address, decimals FROM network_tokens
                WHERE network_id = $1 AND token_id = $2",
        )
        .bind(network_id)
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(NetworkToken::try_from).transpose()?)
    }

    async fn network_token_by_contract(
        &self,
        network_id: u32,
        contract_address: &[u8],
    ) -> DbResult<Option<NetworkToken>> {
        let row = sqlx::query_as::<_, NetworkTokenRow>(
            "SELECT network_id, token_id, contract_address, decimals FROM network_tokens
                WHERE network_id = $1 AND contract_address = $2",
        )
        .bind(network_id)
        .bind(contract_address)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(NetworkToken::try_from).transpose()?)
    }

    async fn network_tokens(&self, token_id: i64) -> DbResult<Vec<NetworkToken>> {
        let rows = sqlx::query_as::<_, NetworkTokenRow>(
            "SELECT network_id, token_id, contract_address, decimals FROM network_tokens
                WHERE token_id = $1
                ORDER BY network_id",
        )
        .bind(token_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(rows
            .into_iter()
            .map(NetworkToken::try_from)
            .collect::<Result<_, _>>()?)
    }
}

#[async_trait]
impl TransactionDb for SqliteDb {
    async fn insert_transaction(&self, tx: &NewTransaction) -> DbResult<Option<i64>> {
        let pool = &self.pool;

        execute_with_retries(&self.config, || insert_transaction_once(pool, tx)).await
    }

    async fn transaction(&self, id: i64) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, network_id, tx_hash, sender, block_number, seen_at FROM transactions
                WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(Transaction::try_from).transpose()?)
    }

    async fn transaction_by_hash(
        &self,
        network_id: u32,
        tx_hash: &[u8],
    ) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, network_id, tx_hash, sender, block_number, seen_at FROM transactions
                WHERE network_id = $1 AND tx_hash = $2",
        )
        .bind(network_id)
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(row.map(Transaction::try_from).transpose()?)
    }
}

#[async_trait]
impl TokenTransferDb for SqliteDb {
    async fn record_deposit(
        &self,
        tx: &NewTransaction,
        deposit: &NewDeposit,
    ) -> DbResult<Option<TokenTransfer>> {
        let pool = &self.pool;

        execute_with_retries(&self.config, || record_deposit_once(pool, tx, deposit)).await
    }

    async fn transfer(&self, id: i64) -> DbResult<Option<TokenTransfer>> {
        let row = sqlx::query_as::<_, TokenTransferRow>(&transfer_query("tt.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(TokenTransfer::try_from).transpose()?)
    }

    async fn transfer_by_triggering_tx(
        &self,
        network_id: u32,
        tx_hash: &[u8],
    ) -> DbResult<Option<TokenTransfer>> {
        let sql = transfer_query("txt.network_id = $1 AND txt.tx_hash = $2");
        let row = sqlx::query_as::<_, TokenTransferRow>(&sql)
            .bind(network_id)
            .bind(tx_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(TokenTransfer::try_from).transpose()?)
    }

    async fn transfer_by_outbound_tx(&self, tx_id: i64) -> DbResult<Option<TokenTransfer>> {
        let row = sqlx::query_as::<_, TokenTransferRow>(&transfer_query("tt.outbound_tx = $1"))
            .bind(tx_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(TokenTransfer::try_from).transpose()?)
    }

    async fn latest_confirming_transfer(
        &self,
        release: &TransferMatch,
    ) -> DbResult<Option<TokenTransfer>> {
        let sql = transfer_query(
            "tt.status = $1 AND tt.amount = $2 AND tt.sender_network_id = $3
                AND tt.sender_address = $4 AND tt.recipient_network_id = $5
                AND tt.recipient_address = $6",
        );
        let row = sqlx::query_as::<_, TokenTransferRow>(&sql)
            .bind(DbTransferStatus::from(TransferStatus::Confirming))
            .bind(DbAmount::from(release.amount))
            .bind(release.sender_network_id)
            .bind(release.sender_address.as_slice())
            .bind(release.recipient_network_id)
            .bind(release.recipient_address.as_slice())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(TokenTransfer::try_from).transpose()?)
    }

    async fn confirm_transfer(&self, id: i64, outbound: &NewTransaction) -> DbResult<bool> {
        let pool = &self.pool;

        execute_with_retries(&self.config, || confirm_transfer_once(pool, id, outbound)).await
    }

    async fn finish_transfer(&self, id: i64, outbound_tx: i64) -> DbResult<bool> {
        let pool = &self.pool;

        execute_with_retries(&self.config, || {
            move_transfer_once(
                pool,
                id,
                TransferStatus::Confirming,
                TransferStatus::Finished,
                Some(outbound_tx),
            )
        })
        .await
    }

    async fn update_transfer_status(
        &self,
        id: i64,
        from: TransferStatus,
        to: TransferStatus,
    ) -> DbResult<bool> {
        if !from.can_transition_to(to) {
            return Err(StorageError::InvalidData(format!(
                "transfer {id} cannot move from {from} to {to}"
            ))
            .into());
        }

        let pool = &self.pool;

        execute_with_retries(&self.config, || move_transfer_once(pool, id, from, to, None)).await
    }

    async fn transfers_by_sender(
        &self,
        network_id: u32,
        sender_address: &[u8],
        offset: u64,
        limit: u64,
    ) -> DbResult<Vec<TokenTransfer>> {
        let sql = format!(
            "SELECT {TRANSFER_COLUMNS} FROM token_transfers AS tt
                LEFT JOIN transactions AS txt ON tt.triggering_tx = txt.id
                WHERE tt.sender_network_id = $1 AND tt.sender_address = $2
                ORDER BY txt.seen_at DESC, tt.id DESC
                LIMIT $3 OFFSET $4"
        );

        let rows = sqlx::query_as::<_, TokenTransferRow>(&sql)
            .bind(network_id)
            .bind(sender_address)
            .bind(to_i64(limit, "limit")?)
            .bind(to_i64(offset, "offset")?)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows
            .into_iter()
            .map(TokenTransfer::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn count_transfers_by_sender(
        &self,
        network_id: u32,
        sender_address: &[u8],
    ) -> DbResult<u64> {
        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM token_transfers
                WHERE sender_network_id = $1 AND sender_address = $2",
        )
        .bind(network_id)
        .bind(sender_address)
        .fetch_one(&self.pool)
        .await
        .and_then(|row| row.try_get("total"))
        .map_err(StorageError::from)?;

        Ok(u64::try_from(total)
            .map_err(|_| StorageError::MismatchedTypes(format!("negative count {total}")))?)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use ethnum::U256;
    use futures::future::join_all;
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

    use super::*;
    use crate::MIGRATOR;

    const GOERLI: u32 = 5;
    const SOLANA: u32 = 2;

    async fn db() -> SqliteDb {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("must open in-memory database");
        MIGRATOR.run(&pool).await.expect("must migrate");

        SqliteDb::new(pool, DbConfig::default())
    }

    fn deposit_tx(hash: u8) -> NewTransaction {
        NewTransaction {
            network_id: GOERLI,
            tx_hash: vec![hash; 32],
            sender: vec![0x7e; 20],
            block_number: 100,
            seen_at: DateTime::<Utc>::from_timestamp_millis(1_672_943_628_000 + hash as i64)
                .expect("must be a valid timestamp"),
        }
    }

    fn deposit(token_id: i64, amount: u64) -> NewDeposit {
        NewDeposit {
            token_id,
            amount: U256::from(amount),
            sender_network_id: GOERLI,
            sender_address: vec![0x7e; 20],
            recipient_network_id: SOLANA,
            recipient_address: vec![0x3a; 32],
        }
    }

    async fn usdt(db: &SqliteDb) -> i64 {
        db.create_token("USDT", "Tether USD")
            .await
            .expect("must create token")
    }

    #[tokio::test]
    async fn test_nonces_start_at_one_and_increase() {
        let db = db().await;

        assert_eq!(db.current_nonce(GOERLI).await.expect("must read"), 0);
        assert_eq!(db.next_nonce(GOERLI).await.expect("must allocate"), 1);
        assert_eq!(db.next_nonce(GOERLI).await.expect("must allocate"), 2);
        assert_eq!(
            db.next_nonce(SOLANA).await.expect("must allocate"),
            1,
            "networks must have independent counters"
        );
        assert_eq!(db.current_nonce(GOERLI).await.expect("must read"), 2);
    }

    #[tokio::test]
    async fn test_concurrent_nonces_are_distinct() {
        let dir = tempfile::tempdir().expect("must create temp dir");
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("bridge.db"))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .expect("must open database");
        MIGRATOR.run(&pool).await.expect("must migrate");
        let db = SqliteDb::new(pool, DbConfig::default());

        let mut nonces = join_all((0..16).map(|_| db.next_nonce(GOERLI)))
            .await
            .into_iter()
            .collect::<DbResult<Vec<_>>>()
            .expect("must allocate");
        nonces.sort_unstable();

        assert_eq!(
            nonces,
            (1..=16).collect::<Vec<u64>>(),
            "concurrent allocations must never repeat a nonce"
        );
    }

    #[tokio::test]
    async fn test_network_blocks() {
        let db = db().await;

        assert_eq!(db.last_seen_block(GOERLI).await.expect("must read"), None);

        db.set_last_seen_block(GOERLI, 0).await.expect("must create");
        assert_eq!(db.last_seen_block(GOERLI).await.expect("must read"), Some(0));

        db.set_last_seen_block(GOERLI, 7501)
            .await
            .expect("must update");
        assert_eq!(
            db.last_seen_block(GOERLI).await.expect("must read"),
            Some(7501)
        );
    }

    #[tokio::test]
    async fn test_token_registry() {
        let db = db().await;
        let usdt = usdt(&db).await;
        let other = db
            .create_token("TRC", "Tricorn")
            .await
            .expect("must create token");

        for (network_id, contract) in [(GOERLI, vec![0x9f; 20]), (SOLANA, vec![0x11; 32])] {
            db.put_network_token(&NetworkToken {
                network_id,
                token_id: usdt,
                contract_address: contract,
                decimals: 18,
            })
            .await
            .expect("must store network token");
        }

        let tokens = db.tokens_on_network(GOERLI).await.expect("must list");
        assert_eq!(tokens.len(), 1, "tokens without a deployment must not be listed");
        assert_eq!(tokens[0].short_name, "USDT");
        assert!(db.tokens_on_network(1).await.expect("must list").is_empty());
        assert_eq!(
            db.token(other).await.expect("must read").map(|t| t.long_name),
            Some("Tricorn".to_string())
        );

        let by_contract = db
            .network_token_by_contract(GOERLI, &[0x9f; 20])
            .await
            .expect("must read")
            .expect("must exist");
        assert_eq!(by_contract.token_id, usdt);

        let deployments = db.network_tokens(usdt).await.expect("must list");
        assert_eq!(
            deployments
                .iter()
                .map(|t| t.network_id)
                .collect::<Vec<_>>(),
            vec![SOLANA, GOERLI]
        );
    }

    #[tokio::test]
    async fn test_duplicate_transactions_keep_first_write() {
        let db = db().await;
        let tx = deposit_tx(1);

        let id = db
            .insert_transaction(&tx)
            .await
            .expect("must insert")
            .expect("must be new");

        let mut replay = tx.clone();
        replay.block_number = 999;
        assert_eq!(
            db.insert_transaction(&replay).await.expect("must not fail"),
            None,
            "a duplicate hash must be reported as already recorded"
        );

        let stored = db
            .transaction_by_hash(GOERLI, &tx.tx_hash)
            .await
            .expect("must read")
            .expect("must exist");
        assert_eq!(stored.id, id);
        assert_eq!(stored.block_number, 100, "the first write must win");
        assert_eq!(stored.seen_at, tx.seen_at);
    }

    #[tokio::test]
    async fn test_deposit_lifecycle() {
        let db = db().await;
        let token_id = usdt(&db).await;
        let amount = 1_000_000_000_000u64;

        let transfer = db
            .record_deposit(&deposit_tx(1), &deposit(token_id, amount))
            .await
            .expect("must record")
            .expect("must be new");
        assert_eq!(transfer.status, TransferStatus::Waiting);
        assert_eq!(transfer.amount, U256::from(amount));
        assert_eq!(transfer.outbound_tx, None);

        assert!(
            db.record_deposit(&deposit_tx(1), &deposit(token_id, amount))
                .await
                .expect("must not fail")
                .is_none(),
            "a replayed deposit must not create a second transfer"
        );

        let outbound = NewTransaction {
            network_id: SOLANA,
            tx_hash: vec![0xaa; 64],
            sender: vec![0x01; 32],
            block_number: 0,
            seen_at: Utc::now(),
        };
        assert!(db
            .confirm_transfer(transfer.id, &outbound)
            .await
            .expect("must confirm"));
        assert!(
            !db.confirm_transfer(transfer.id, &outbound)
                .await
                .expect("must not fail"),
            "only waiting transfers must be confirmed"
        );

        let outbound_tx = db
            .transaction_by_hash(SOLANA, &outbound.tx_hash)
            .await
            .expect("must read")
            .expect("must exist");
        let by_outbound = db
            .transfer_by_outbound_tx(outbound_tx.id)
            .await
            .expect("must read")
            .expect("must exist");
        assert_eq!(by_outbound.id, transfer.id);
        assert_eq!(by_outbound.status, TransferStatus::Confirming);

        let matched = db
            .latest_confirming_transfer(&TransferMatch {
                amount: U256::from(amount),
                sender_network_id: GOERLI,
                sender_address: vec![0x7e; 20],
                recipient_network_id: SOLANA,
                recipient_address: vec![0x3a; 32],
            })
            .await
            .expect("must read")
            .expect("must match");
        assert_eq!(matched.id, transfer.id);

        assert!(db
            .finish_transfer(transfer.id, outbound_tx.id)
            .await
            .expect("must finish"));

        let finished = db
            .transfer_by_triggering_tx(GOERLI, &[1; 32])
            .await
            .expect("must read")
            .expect("must exist");
        assert_eq!(finished.status, TransferStatus::Finished);
        assert_eq!(finished.outbound_tx, Some(outbound_tx.id));
    }

    #[tokio::test]
    async fn test_status_updates_are_validated() {
        let db = db().await;
        let token_id = usdt(&db).await;
        let transfer = db
            .record_deposit(&deposit_tx(2), &deposit(token_id, 10))
            .await
            .expect("must record")
            .expect("must be new");

        assert!(
            db.update_transfer_status(
                transfer.id,
                TransferStatus::Waiting,
                TransferStatus::Finished
            )
            .await
            .is_err(),
            "illegal transitions must be rejected"
        );
        assert!(
            !db.update_transfer_status(
                transfer.id,
                TransferStatus::Confirming,
                TransferStatus::Cancelled
            )
            .await
            .expect("must not fail"),
            "a stale expected status must not match"
        );
        assert!(db
            .update_transfer_status(
                transfer.id,
                TransferStatus::Waiting,
                TransferStatus::Cancelled
            )
            .await
            .expect("must cancel"));

        let cancelled = db
            .transfer(transfer.id)
            .await
            .expect("must read")
            .expect("must exist");
        assert_eq!(cancelled.status, TransferStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let db = db().await;
        let token_id = usdt(&db).await;

        for hash in 1..=5u8 {
            db.record_deposit(&deposit_tx(hash), &deposit(token_id, hash as u64))
                .await
                .expect("must record");
        }

        let page = db
            .transfers_by_sender(GOERLI, &[0x7e; 20], 1, 2)
            .await
            .expect("must list");
        assert_eq!(
            page.iter().map(|t| t.amount).collect::<Vec<_>>(),
            vec![U256::from(4u64), U256::from(3u64)]
        );
        assert_eq!(
            db.count_transfers_by_sender(GOERLI, &[0x7e; 20])
                .await
                .expect("must count"),
            5
        );
        assert_eq!(
            db.count_transfers_by_sender(SOLANA, &[0x7e; 20])
                .await
                .expect("must count"),
            0
        );
    }

    #[tokio::test]
    async fn test_retries_transient_errors_only() {
        let config = DbConfig::default()
            .with_max_retry_count(3)
            .with_backoff_period(Duration::from_millis(1));

        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = execute_with_retries(&config, || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(DbError::from(StorageError::from(sqlx::Error::PoolTimedOut)))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.expect("must succeed eventually"), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: DbResult<()> = execute_with_retries(&config, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DbError::from(StorageError::InvalidData("bad".into())))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "permanent errors must not be retried"
        );

        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: DbResult<()> = execute_with_retries(&config, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DbError::from(StorageError::from(sqlx::Error::PoolTimedOut)))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(
            counter.load(Ordering::SeqCst),
            4,
            "retries must stop after the configured count"
        );
    }
}
