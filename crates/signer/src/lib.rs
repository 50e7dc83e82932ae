//! Custodial signing for every chain family the bridge talks to.
//!
//! Keys are looked up per `(network type, usage)` pair from an injected [`KeyStore`]. The
//! [`SignerService`] turns them into chain-native signatures and public keys. Consumers that only
//! need signatures depend on the [`BridgeSigner`] capability, which is implemented both by the
//! in-process service and by remote clients.

pub mod errors;
pub mod keystore;
pub mod service;
pub mod usage;

pub use errors::{SignerError, SignerResult};
pub use keystore::{InMemoryKeyStore, KeyStore, SqliteKeyStore};
pub use service::{BridgeSigner, SignerService};
pub use usage::KeyUsage;

/// Migrations of the signer keystore.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
