//! Token prices for the bridge.
//!
//! A [`CurrencyRates`] source answers price queries. The [`PriceTicker`] polls a source at a fixed
//! interval and multicasts every [`TokenPrice`] it reads to its subscribers.

pub mod config;
pub mod errors;
pub mod http;
pub mod rates;
pub mod ticker;

pub use config::CurrencyRatesConfig;
pub use errors::{CurrencyRatesError, CurrencyRatesResult};
pub use http::HttpCurrencyRates;
pub use rates::{Currency, CurrencyRates, TokenPrice};
pub use ticker::PriceTicker;
