//! Errors of the bridge store.

use thiserror::Error;

use crate::persistent::errors::StorageError;

/// Errors that can occur when reading or writing the bridge state.
#[derive(Debug, Error)]
pub enum DbError {
    /// The storage backend failed.
    #[error("sqlite: {0}")]
    Storage(#[from] StorageError),
}

impl DbError {
    /// Whether the failure is a transient lock conflict that may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            DbError::Storage(StorageError::Driver(err)) => is_transient_driver_error(err),
            DbError::Storage(_) => false,
        }
    }
}

/// `SQLITE_BUSY`, `SQLITE_LOCKED` and their extended codes.
const TRANSIENT_SQLITE_CODES: [&str; 4] = ["5", "6", "262", "517"];

fn is_transient_driver_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| TRANSIENT_SQLITE_CODES.contains(&code.as_ref())),
        _ => false,
    }
}

/// Result alias for store operations.
pub type DbResult<T> = Result<T, DbError>;
