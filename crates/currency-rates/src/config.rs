//! Configuration of the price ticker.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Public price endpoint queried unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "https://min-api.cryptocompare.com/data/price";

/// Seconds between two price reads unless configured otherwise.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Timeout of a single price request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how often prices are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyRatesConfig {
    /// Endpoint answering `?fsym=..&tsyms=..` queries.
    pub base_url: String,

    /// Seconds between two price reads.
    pub events_reading_interval_in_seconds: u64,

    /// Symbol whose price is read.
    pub from: String,

    /// Symbol the price is expressed in.
    pub to: String,

    /// Decimals reported with every price.
    pub decimals: u32,
}

impl Default for CurrencyRatesConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            events_reading_interval_in_seconds: DEFAULT_INTERVAL_SECS,
            from: "USDT".to_owned(),
            to: "ETH".to_owned(),
            decimals: 18,
        }
    }
}

impl CurrencyRatesConfig {
    /// Sets the price endpoint.
    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..self
        }
    }

    /// Interval between two price reads, never shorter than a second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.events_reading_interval_in_seconds.max(1))
    }
}
