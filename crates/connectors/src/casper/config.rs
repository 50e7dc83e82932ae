//! Configuration of a Casper connector.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tricorn_primitives::{codec, networks::Network};

use crate::errors::{ConnectorError, ConnectorResult};

/// Default period of the live tail.
pub const DEFAULT_EVENTS_READING_INTERVAL_IN_SECONDS: u64 = 10;

/// Default validity window of BridgeIn signatures.
pub const DEFAULT_SIGNATURE_VALIDITY_TIME: u64 = 3600;

/// Default timeout of a single node request.
pub const DEFAULT_REQUEST_TIMEOUT_IN_SECONDS: u64 = 30;

/// Default prefix of BridgeIn signature payloads.
pub const DEFAULT_BRIDGE_IN_PREFIX: &str = "TRICORN_BRIDGE_IN";

/// Default prefix of cancel signature payloads.
pub const DEFAULT_TRANSFER_OUT_PREFIX: &str = "TRICORN_TRANSFER_OUT";

/// Settings of the Casper network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasperConfig {
    /// The network this connector serves.
    pub chain_name: Network,

    /// JSON-RPC endpoint of the node.
    pub node_address: String,

    /// Hash of the bridge contract, 64 hex characters.
    pub bridge_contract_address: String,

    /// Key of the transforms that carry bridge events, as rendered by the node.
    pub bridge_events_hash: String,

    /// Payment attached to outbound deploys, also reported as the transfer fee.
    pub gas_limit: u64,

    /// Live tail period.
    #[serde(default = "default_events_reading_interval")]
    pub events_reading_interval_in_seconds: u64,

    /// Validity window of BridgeIn signatures, in seconds.
    #[serde(default = "default_signature_validity_time")]
    pub signature_validity_time: u64,

    /// Expected confirmation time reported by the estimator, in seconds.
    #[serde(default)]
    pub confirmation_time: u32,

    /// Percentage fee reported by the estimator.
    #[serde(default)]
    pub fee_percentage: String,

    /// Domain prefix of BridgeIn signature payloads.
    #[serde(default = "default_bridge_in_prefix")]
    pub bridge_in_prefix: String,

    /// Domain prefix of cancel signature payloads.
    #[serde(default = "default_transfer_out_prefix")]
    pub transfer_out_prefix: String,

    /// Timeout of a single node request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_seconds: u64,
}

fn default_events_reading_interval() -> u64 {
    DEFAULT_EVENTS_READING_INTERVAL_IN_SECONDS
}

fn default_signature_validity_time() -> u64 {
    DEFAULT_SIGNATURE_VALIDITY_TIME
}

fn default_bridge_in_prefix() -> String {
    DEFAULT_BRIDGE_IN_PREFIX.to_string()
}

fn default_transfer_out_prefix() -> String {
    DEFAULT_TRANSFER_OUT_PREFIX.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_IN_SECONDS
}

impl CasperConfig {
    /// Creates a config with defaults for everything but the network identity.
    pub fn new(
        chain_name: Network,
        node_address: &str,
        bridge_contract: &str,
        bridge_events_hash: &str,
    ) -> Self {
        Self {
            chain_name,
            node_address: node_address.to_string(),
            bridge_contract_address: bridge_contract.to_string(),
            bridge_events_hash: bridge_events_hash.to_string(),
            gas_limit: 0,
            events_reading_interval_in_seconds: DEFAULT_EVENTS_READING_INTERVAL_IN_SECONDS,
            signature_validity_time: DEFAULT_SIGNATURE_VALIDITY_TIME,
            confirmation_time: 0,
            fee_percentage: String::new(),
            bridge_in_prefix: default_bridge_in_prefix(),
            transfer_out_prefix: default_transfer_out_prefix(),
            request_timeout_in_seconds: DEFAULT_REQUEST_TIMEOUT_IN_SECONDS,
        }
    }

    /// Updates the deploy payment.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Updates the signature payload prefixes.
    pub fn with_prefixes(mut self, bridge_in: &str, transfer_out: &str) -> Self {
        self.bridge_in_prefix = bridge_in.to_string();
        self.transfer_out_prefix = transfer_out.to_string();
        self
    }

    /// Updates the values reported by the estimator.
    pub fn with_estimation(mut self, fee_percentage: &str, confirmation_time: u32) -> Self {
        self.fee_percentage = fee_percentage.to_string();
        self.confirmation_time = confirmation_time;
        self
    }

    /// Live tail period.
    pub fn events_reading_interval(&self) -> Duration {
        Duration::from_secs(self.events_reading_interval_in_seconds.max(1))
    }

    /// Timeout of a single node request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_in_seconds)
    }

    /// Decoded bridge contract hash.
    pub fn bridge_contract(&self) -> ConnectorResult<[u8; 32]> {
        let bytes = codec::string_to_bytes(self.chain_name, &self.bridge_contract_address)?;
        bytes.try_into().map_err(|_| {
            ConnectorError::InvalidConfig(format!(
                "bridge contract {} is not a 32 byte hash",
                self.bridge_contract_address
            ))
        })
    }

    /// Name of the chain deploys are bound to.
    pub fn deploy_chain_name(&self) -> String {
        self.chain_name.name().to_lowercase()
    }
}
