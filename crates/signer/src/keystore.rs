//! Storage of private keys.

use std::{collections::HashMap, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use tricorn_primitives::networks::NetworkType;

use crate::{
    errors::{SignerError, SignerResult},
    usage::KeyUsage,
};

/// Source of hex-encoded private keys, one per `(network type, usage)` pair.
#[async_trait]
pub trait KeyStore: Debug + Send + Sync {
    /// Returns the hex-encoded key, or [`SignerError::NoPrivateKey`] if none is stored.
    async fn private_key(&self, network_type: NetworkType, usage: KeyUsage) -> SignerResult<String>;

    /// Stores the hex-encoded key, replacing any previous key for the pair.
    async fn put_private_key(
        &self,
        network_type: NetworkType,
        usage: KeyUsage,
        key_hex: &str,
    ) -> SignerResult<()>;
}

/// Keystore backed by the `private_keys` table.
#[derive(Debug, Clone)]
pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    /// Wraps a pool whose database has been migrated with [`MIGRATOR`](crate::MIGRATOR).
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn private_key(&self, network_type: NetworkType, usage: KeyUsage) -> SignerResult<String> {
        let row = sqlx::query(
            "SELECT private_key FROM private_keys WHERE network_type = $1 AND type = $2",
        )
        .bind(network_type.as_str())
        .bind(usage.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.try_get::<String, _>("private_key")?),
            None => Err(SignerError::NoPrivateKey {
                network_type,
                usage,
            }),
        }
    }

    async fn put_private_key(
        &self,
        network_type: NetworkType,
        usage: KeyUsage,
        key_hex: &str,
    ) -> SignerResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO private_keys (network_type, private_key, type)
                VALUES ($1, $2, $3)",
        )
        .bind(network_type.as_str())
        .bind(key_hex)
        .bind(usage.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(%network_type, %usage, "stored private key");
        Ok(())
    }
}

/// Keystore kept in memory, for tests and mock deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyStore {
    keys: Arc<RwLock<HashMap<(NetworkType, KeyUsage), String>>>,
}

impl InMemoryKeyStore {
    /// Creates an empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, builder style.
    pub fn with_key(self, network_type: NetworkType, usage: KeyUsage, key_hex: &str) -> Self {
        self.keys
            .write()
            .insert((network_type, usage), key_hex.to_owned());
        self
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn private_key(&self, network_type: NetworkType, usage: KeyUsage) -> SignerResult<String> {
        self.keys
            .read()
            .get(&(network_type, usage))
            .cloned()
            .ok_or(SignerError::NoPrivateKey {
                network_type,
                usage,
            })
    }

    async fn put_private_key(
        &self,
        network_type: NetworkType,
        usage: KeyUsage,
        key_hex: &str,
    ) -> SignerResult<()> {
        self.keys
            .write()
            .insert((network_type, usage), key_hex.to_owned());
        Ok(())
    }
}
