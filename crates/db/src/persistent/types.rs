//! Column-level mappings of the domain types that SQLite has no native type for.

use std::ops::Deref;

use ethnum::U256;
use sqlx::{sqlite::SqliteValueRef, Sqlite};
use tricorn_primitives::transfer::TransferStatus;

/// A `U256` stored as its minimal big-endian bytes in a `BLOB`.
///
/// The encoding is canonical, so amounts can be compared for equality in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DbAmount(U256);

impl Deref for DbAmount {
    type Target = U256;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<U256> for DbAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl DbAmount {
    pub(super) fn to_bytes(self) -> Vec<u8> {
        let be = self.0.to_be_bytes();
        let start = be.iter().position(|b| *b != 0).unwrap_or(be.len());
        be[start..].to_vec()
    }

    pub(super) fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > 32 {
            return None;
        }

        let mut be = [0u8; 32];
        be[32 - bytes.len()..].copy_from_slice(bytes);
        Some(Self(U256::from_be_bytes(be)))
    }
}

impl sqlx::Type<Sqlite> for DbAmount {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <Vec<u8> as sqlx::Type<Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for DbAmount {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let bytes: Vec<u8> = sqlx::decode::Decode::<'r, Sqlite>::decode(value)?;
        let amount = DbAmount::from_bytes(&bytes)
            .ok_or_else(|| sqlx::Error::Decode("amount does not fit in 256 bits".into()))?;

        Ok(amount)
    }
}

impl<'q> sqlx::Encode<'q, Sqlite> for DbAmount {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        sqlx::Encode::<'q, Sqlite>::encode(self.to_bytes(), buf)
    }
}

/// A [`TransferStatus`] stored as its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DbTransferStatus(TransferStatus);

impl Deref for DbTransferStatus {
    type Target = TransferStatus;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<TransferStatus> for DbTransferStatus {
    fn from(value: TransferStatus) -> Self {
        Self(value)
    }
}

impl sqlx::Type<Sqlite> for DbTransferStatus {
    fn type_info() -> <Sqlite as sqlx::Database>::TypeInfo {
        <String as sqlx::Type<Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, Sqlite> for DbTransferStatus {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let status: String = sqlx::decode::Decode::<'r, Sqlite>::decode(value)?;
        let status = status
            .parse::<TransferStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(Self(status))
    }
}

impl<'q> sqlx::Encode<'q, Sqlite> for DbTransferStatus {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        sqlx::Encode::<'q, Sqlite>::encode_by_ref(&self.0.as_str(), buf)
    }
}
