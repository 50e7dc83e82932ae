//! What a private key may be used for.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::SignerError;

/// Purpose of a stored private key.
///
/// Transaction keys sign envelopes submitted to a chain. Signature keys sign payloads that bridge
/// contracts check on behalf of users (deadlines, nonces, amounts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyUsage {
    /// Signs outbound transactions and deploys.
    #[serde(rename = "DT_TRANSACTION")]
    Transaction,
    /// Signs bridge contract payloads.
    #[serde(rename = "DT_SIGNATURE")]
    Signature,
}

impl KeyUsage {
    /// Storage and wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            KeyUsage::Transaction => "DT_TRANSACTION",
            KeyUsage::Signature => "DT_SIGNATURE",
        }
    }
}

impl FromStr for KeyUsage {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DT_TRANSACTION" => Ok(KeyUsage::Transaction),
            "DT_SIGNATURE" => Ok(KeyUsage::Signature),
            other => Err(SignerError::UnknownKeyUsage(other.to_owned())),
        }
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
