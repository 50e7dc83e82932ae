//! Decoder of the bridge event blobs the Casper contract writes to global state.
//!
//! A blob is a serialized `List<u8>`: a little endian `u32` length followed by
//! - a one byte event type tag,
//! - the 32 byte token contract hash,
//! - the chain name and chain address, each as a `u32` length prefixed string,
//! - the integer fields of the event, each as a one byte length followed by the little endian
//!   magnitude,
//! - a tagged 32 byte user account hash.

use ethnum::U256;
use tricorn_primitives::events::EventType;

use crate::errors::{ConnectorError, ConnectorResult};

/// Integer fields that differ between the two event types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobFields {
    /// Fields of a funds-in event.
    FundsIn {
        /// Locked amount.
        amount: U256,
        /// Commission withheld for gas on the destination chain.
        gas_commission: U256,
        /// Commission percentage in stable coins.
        stable_commission_percent: U256,
        /// Bridge nonce.
        nonce: U256,
    },
    /// Fields of a funds-out event.
    FundsOut {
        /// Released amount.
        amount: U256,
        /// Identifier of the transaction on the source chain.
        transaction_id: U256,
    },
}

/// A decoded event blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlob {
    /// Token contract package hash.
    pub token: [u8; 32],
    /// Name of the other network.
    pub chain_name: String,
    /// Address on the other network.
    pub chain_address: String,
    /// Type specific fields.
    pub fields: BlobFields,
    /// Account hash of the user.
    pub user: [u8; 32],
}

impl EventBlob {
    /// Type of the event.
    pub const fn event_type(&self) -> EventType {
        match self.fields {
            BlobFields::FundsIn { .. } => EventType::In,
            BlobFields::FundsOut { .. } => EventType::Out,
        }
    }

    /// Moved amount.
    pub const fn amount(&self) -> U256 {
        match self.fields {
            BlobFields::FundsIn { amount, .. } | BlobFields::FundsOut { amount, .. } => amount,
        }
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> ConnectorResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                ConnectorError::MalformedEvent(format!(
                    "blob truncated reading {what} at offset {}",
                    self.offset
                ))
            })?;

        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn byte(&mut self, what: &str) -> ConnectorResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn hash(&mut self, what: &str) -> ConnectorResult<[u8; 32]> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.take(32, what)?);
        Ok(out)
    }

    fn u32_le(&mut self, what: &str) -> ConnectorResult<u32> {
        let mut out = [0u8; 4];
        out.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(out))
    }

    fn string(&mut self, what: &str) -> ConnectorResult<String> {
        let len = self.u32_le(what)? as usize;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ConnectorError::MalformedEvent(format!("{what} is not utf-8: {e}")))
    }

    fn uint(&mut self, what: &str) -> ConnectorResult<U256> {
        let len = self.byte(what)? as usize;
        if len > 32 {
            return Err(ConnectorError::MalformedEvent(format!(
                "{what} is {len} bytes long"
            )));
        }

        let mut be = [0u8; 32];
        for (i, b) in self.take(len, what)?.iter().enumerate() {
            be[31 - i] = *b;
        }
        Ok(U256::from_be_bytes(be))
    }
}

/// Decodes a raw event blob.
///
/// Fails with [`ConnectorError::MalformedEvent`] on truncated input and with
/// [`ConnectorError::UnknownEventType`] on an unknown tag.
pub fn decode_blob(data: &[u8]) -> ConnectorResult<EventBlob> {
    let mut cursor = Cursor::new(data);
    cursor.take(4, "list length")?;

    let tag = cursor.byte("event type")?;
    let event_type = EventType::from_int(tag).ok_or(ConnectorError::UnknownEventType(tag))?;

    let token = cursor.hash("token")?;
    let chain_name = cursor.string("chain name")?;
    let chain_address = cursor.string("chain address")?;

    let fields = match event_type {
        EventType::In => BlobFields::FundsIn {
            amount: cursor.uint("amount")?,
            gas_commission: cursor.uint("gas commission")?,
            stable_commission_percent: cursor.uint("stable commission percent")?,
            nonce: cursor.uint("nonce")?,
        },
        EventType::Out => BlobFields::FundsOut {
            amount: cursor.uint("amount")?,
            transaction_id: cursor.uint("transaction id")?,
        },
    };

    // account tag.
    cursor.byte("user tag")?;
    let user = cursor.hash("user")?;

    Ok(EventBlob {
        token,
        chain_name,
        chain_address,
        fields,
        user,
    })
}
