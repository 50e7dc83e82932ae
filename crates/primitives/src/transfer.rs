//! Lifecycle of a cross-chain transfer.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Status of a transfer.
///
/// ```text
///   WAITING ──▶ CONFIRMING ──▶ FINISHED
///      │             │
///      └─────────────┴──────▶ CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    /// The deposit was observed on the source chain.
    Waiting,
    /// The outbound transaction was submitted on the destination chain.
    Confirming,
    /// The user was issued a refund signature.
    Cancelled,
    /// The release was observed on the destination chain.
    Finished,
}

impl TransferStatus {
    /// Wire and storage representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Waiting => "WAITING",
            TransferStatus::Confirming => "CONFIRMING",
            TransferStatus::Cancelled => "CANCELLED",
            TransferStatus::Finished => "FINISHED",
        }
    }

    /// Whether no transition leaves this status.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Cancelled | TransferStatus::Finished)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub const fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (TransferStatus::Waiting, TransferStatus::Confirming)
                | (TransferStatus::Waiting, TransferStatus::Cancelled)
                | (TransferStatus::Confirming, TransferStatus::Finished)
                | (TransferStatus::Confirming, TransferStatus::Cancelled)
        )
    }
}

impl FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(TransferStatus::Waiting),
            "CONFIRMING" => Ok(TransferStatus::Confirming),
            "CANCELLED" => Ok(TransferStatus::Cancelled),
            "FINISHED" => Ok(TransferStatus::Finished),
            other => Err(format!("unknown transfer status {other}")),
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
