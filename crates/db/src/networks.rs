//! Per-network bookkeeping: nonces, scanned blocks and the token registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DbResult;

/// A token the bridge can move, independent of any network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Registry id.
    pub id: i64,
    /// Ticker, e.g. `USDT`.
    pub short_name: String,
    /// Human readable name.
    pub long_name: String,
}

/// Deployment of a [`Token`] on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkToken {
    /// Network the contract lives on.
    pub network_id: u32,
    /// Registry id of the token.
    pub token_id: i64,
    /// Contract address in the network's byte encoding.
    pub contract_address: Vec<u8>,
    /// Decimals of the deployment.
    pub decimals: u32,
}

/// Bridge nonces, one monotonic counter per network.
#[async_trait]
pub trait NonceDb {
    /// Increments the nonce of `network_id` and returns the new value.
    ///
    /// Concurrent callers always observe distinct values. The first call for a network returns 1.
    async fn next_nonce(&self, network_id: u32) -> DbResult<u64>;

    /// Returns the last allocated nonce of `network_id`, 0 if none was allocated yet.
    async fn current_nonce(&self, network_id: u32) -> DbResult<u64>;
}

/// Last block of each network whose events were fully processed.
#[async_trait]
pub trait NetworkBlockDb {
    /// Returns the last seen block, or `None` if the network was never scanned.
    async fn last_seen_block(&self, network_id: u32) -> DbResult<Option<u64>>;

    /// Records `block` as the last seen block of `network_id`, creating the row if needed.
    async fn set_last_seen_block(&self, network_id: u32, block: u64) -> DbResult<()>;
}

/// The global token registry.
#[async_trait]
pub trait TokenDb {
    /// Inserts a token and returns its id.
    async fn create_token(&self, short_name: &str, long_name: &str) -> DbResult<i64>;

    /// Looks a token up by id.
    async fn token(&self, id: i64) -> DbResult<Option<Token>>;

    /// Lists the tokens deployed on `network_id`, ordered by id.
    async fn tokens_on_network(&self, network_id: u32) -> DbResult<Vec<Token>>;
}

/// Per-network deployments of the registry tokens.
#[async_trait]
pub trait NetworkTokenDb {
    /// Inserts or replaces the deployment of a token on a network.
    async fn put_network_token(&self, network_token: &NetworkToken) -> DbResult<()>;

    /// Looks the deployment of `token_id` on `network_id` up.
    async fn network_token(&self, network_id: u32, token_id: i64)
        -> DbResult<Option<NetworkToken>>;

    /// Looks a deployment up by its contract address.
    async fn network_token_by_contract(
        &self,
        network_id: u32,
        contract_address: &[u8],
    ) -> DbResult<Option<NetworkToken>>;

    /// Lists every deployment of `token_id`, ordered by network id.
    async fn network_tokens(&self, token_id: i64) -> DbResult<Vec<NetworkToken>>;
}
