//! Configuration of an EVM connector.

use std::time::Duration;

use alloy::{
    primitives::{Address, B256},
    sol_types::SolEvent,
};
use serde::{Deserialize, Serialize};
use tricorn_primitives::{codec, networks::Network};

use super::{
    contract::{self, BridgeFundsIn, BridgeFundsOut},
    logs::EventTopics,
};
use crate::errors::{ConnectorError, ConnectorResult};

/// Maximum number of blocks covered by a single `eth_getLogs` call.
pub const LISTENING_LIMIT: u64 = 2500;

/// Default period of the live tail.
pub const DEFAULT_EVENTS_READING_INTERVAL_IN_SECONDS: u64 = 10;

/// Default validity window of BridgeIn signatures.
pub const DEFAULT_SIGNATURE_VALIDITY_TIME: u64 = 3600;

/// Default timeout of a single node request.
pub const DEFAULT_REQUEST_TIMEOUT_IN_SECONDS: u64 = 30;

/// Settings of one EVM network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvmConfig {
    /// The network this connector serves.
    pub chain_name: Network,

    /// EIP-155 chain id.
    pub chain_id: u64,

    /// JSON-RPC endpoint of the node.
    pub node_address: String,

    /// Bridge contract whose logs are filtered and that receives `bridgeOut` calls.
    pub bridge_contract_address: String,

    /// Topic of `BridgeFundsIn`, defaults to the hash of the event signature.
    #[serde(default)]
    pub fund_in_event_hash: Option<String>,

    /// Topic of `BridgeFundsOut`, defaults to the hash of the event signature.
    #[serde(default)]
    pub fund_out_event_hash: Option<String>,

    /// Gas limit used to estimate transfers.
    pub gas_limit: u64,

    /// Multiplier applied to the estimated gas of outbound transactions.
    #[serde(default = "default_gas_limit_coefficient")]
    pub gas_limit_increasing_coefficient: f64,

    /// Multiplier applied to the node's gas price for outbound transactions.
    #[serde(default = "default_gas_price_coefficient")]
    pub gas_price_increasing_coefficient: u64,

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

    /// Timeout of a single node request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_in_seconds: u64,
}

fn default_gas_limit_coefficient() -> f64 {
    1.0
}

fn default_gas_price_coefficient() -> u64 {
    1
}

fn default_events_reading_interval() -> u64 {
    DEFAULT_EVENTS_READING_INTERVAL_IN_SECONDS
}

fn default_signature_validity_time() -> u64 {
    DEFAULT_SIGNATURE_VALIDITY_TIME
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_IN_SECONDS
}

impl EvmConfig {
    /// Creates a config with defaults for everything but the network identity.
    pub fn new(chain_name: Network, chain_id: u64, node_address: &str, bridge_contract: &str) -> Self {
        Self {
            chain_name,
            chain_id,
            node_address: node_address.to_string(),
            bridge_contract_address: bridge_contract.to_string(),
            fund_in_event_hash: None,
            fund_out_event_hash: None,
            gas_limit: 0,
            gas_limit_increasing_coefficient: default_gas_limit_coefficient(),
            gas_price_increasing_coefficient: default_gas_price_coefficient(),
            events_reading_interval_in_seconds: DEFAULT_EVENTS_READING_INTERVAL_IN_SECONDS,
            signature_validity_time: DEFAULT_SIGNATURE_VALIDITY_TIME,
            confirmation_time: 0,
            fee_percentage: String::new(),
            request_timeout_in_seconds: DEFAULT_REQUEST_TIMEOUT_IN_SECONDS,
        }
    }

    /// Updates the gas limit used by the estimator.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Updates both multipliers applied to outbound transaction estimates.
    pub fn with_gas_coefficients(mut self, gas_limit: f64, gas_price: u64) -> Self {
        self.gas_limit_increasing_coefficient = gas_limit;
        self.gas_price_increasing_coefficient = gas_price;
        self
    }

    /// Updates the live tail period.
    pub fn with_events_reading_interval(mut self, seconds: u64) -> Self {
        self.events_reading_interval_in_seconds = seconds;
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

    /// Decoded bridge contract address.
    pub fn bridge_contract(&self) -> ConnectorResult<Address> {
        let bytes = codec::decode_address(self.chain_name.network_type(), &self.bridge_contract_address)?;
        contract::to_address(&bytes).map_err(|_| {
            ConnectorError::InvalidConfig(format!(
                "bridge contract {} is not an EVM address",
                self.bridge_contract_address
            ))
        })
    }

    /// Topics the bridge events are filtered by.
    pub fn event_topics(&self) -> ConnectorResult<EventTopics> {
        Ok(EventTopics {
            fund_in: topic_or_default(
                self.fund_in_event_hash.as_deref(),
                BridgeFundsIn::SIGNATURE_HASH,
            )?,
            fund_out: topic_or_default(
                self.fund_out_event_hash.as_deref(),
                BridgeFundsOut::SIGNATURE_HASH,
            )?,
        })
    }
}

fn topic_or_default(configured: Option<&str>, default: B256) -> ConnectorResult<B256> {
    let Some(configured) = configured.filter(|s| !s.is_empty()) else {
        return Ok(default);
    };

    hex::decode(codec::strip_hex_prefixes(configured))
        .ok()
        .and_then(|bytes| B256::try_from(bytes.as_slice()).ok())
        .ok_or_else(|| ConnectorError::InvalidConfig(format!("invalid event hash {configured}")))
}
