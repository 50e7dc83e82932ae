//! Chain-neutral representation of the bridge contract events.

use ethnum::U256;
use serde::{Deserialize, Serialize};

/// An address on another network, as named by a bridge contract event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrossChainAddress {
    /// Wire name of the network.
    pub network_name: String,
    /// Address rendered in the network's native string encoding.
    pub address: String,
}

/// Where an event was observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionInfo {
    /// Hash of the transaction (or deploy) that emitted the event.
    pub hash: Vec<u8>,
    /// Height of the block that included the transaction.
    pub block_number: u64,
    /// Account that submitted the transaction.
    pub sender: Vec<u8>,
}

/// Tokens locked on the local chain to be released on another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsIn {
    /// Local address that locked the tokens.
    pub from: Vec<u8>,
    /// Recipient on the destination network.
    pub to: CrossChainAddress,
    /// Locked amount in token base units.
    pub amount: U256,
    /// Local token contract.
    pub token: Vec<u8>,
    /// Where the event was observed.
    pub tx: TransactionInfo,
}

/// Tokens released on the local chain for a transfer that started elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsOut {
    /// Sender on the source network.
    pub from: CrossChainAddress,
    /// Local address that received the tokens.
    pub to: Vec<u8>,
    /// Released amount in token base units.
    pub amount: U256,
    /// Local token contract.
    pub token: Vec<u8>,
    /// Where the event was observed.
    pub tx: TransactionInfo,
}

/// A bridge contract event lifted off a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// See [`FundsIn`].
    FundsIn(FundsIn),
    /// See [`FundsOut`].
    FundsOut(FundsOut),
}

impl Event {
    /// Kind of the event.
    pub const fn event_type(&self) -> EventType {
        match self {
            Event::FundsIn(_) => EventType::In,
            Event::FundsOut(_) => EventType::Out,
        }
    }

    /// Transaction that emitted the event.
    pub const fn tx(&self) -> &TransactionInfo {
        match self {
            Event::FundsIn(e) => &e.tx,
            Event::FundsOut(e) => &e.tx,
        }
    }

    /// Block that included the event.
    pub const fn block(&self) -> u64 {
        self.tx().block_number
    }
}

/// Kind of a bridge event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Tokens locked on the local chain.
    In,
    /// Tokens released on the local chain.
    Out,
}

impl EventType {
    /// Numeric tag of the kind, shared with the Casper event blob.
    pub const fn int(&self) -> u8 {
        match self {
            EventType::In => 0,
            EventType::Out => 1,
        }
    }

    /// Parses the numeric tag used by the Casper event blob.
    pub const fn from_int(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(EventType::In),
            1 => Some(EventType::Out),
            _ => None,
        }
    }
}
