//! Persistence of the bridge state.
//!
//! The store is split into narrow traits by concern ([`networks`] for per-network bookkeeping
//! and the token registry, [`transfers`] for observed transactions and the transfers they
//! trigger). [`BridgeDb`] bundles them for consumers that need the whole store.

use std::fmt::Debug;

pub mod errors;
pub mod networks;
pub mod persistent;
pub mod transfers;

use networks::{NetworkBlockDb, NetworkTokenDb, NonceDb, TokenDb};
use transfers::{TokenTransferDb, TransactionDb};

/// Migrations of the bridge database.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// The complete bridge store.
pub trait BridgeDb:
    NonceDb
    + NetworkBlockDb
    + TokenDb
    + NetworkTokenDb
    + TransactionDb
    + TokenTransferDb
    + Debug
    + Send
    + Sync
{
}

impl<T> BridgeDb for T where
    T: NonceDb
        + NetworkBlockDb
        + TokenDb
        + NetworkTokenDb
        + TransactionDb
        + TokenTransferDb
        + Debug
        + Send
        + Sync
{
}
