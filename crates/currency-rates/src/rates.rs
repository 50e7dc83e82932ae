//! The price source capability.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{CurrencyRatesError, CurrencyRatesResult};

/// Price of a token expressed in `symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// Symbol the price is expressed in.
    pub symbol: String,
    /// Price of one unit.
    pub price: f64,
}

/// A price read by the ticker, as handed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPrice {
    /// Symbol the price is expressed in.
    pub symbol: String,
    /// Price rendered as a decimal string.
    pub amount: String,
    /// Decimals of the token.
    pub decimals: u32,
    /// When the price was read.
    pub last_update: DateTime<Utc>,
}

/// Source of token prices.
#[async_trait]
pub trait CurrencyRates: Debug + Send + Sync {
    /// Price of `from` expressed in `to`.
    async fn get_price(&self, from: &str, to: &str) -> CurrencyRatesResult<Currency>;

    /// Value of `amount` units of `from` expressed in `to`.
    async fn convert(&self, from: &str, to: &str, amount: f64) -> CurrencyRatesResult<f64> {
        if amount <= 0.0 || amount.is_nan() {
            return Err(CurrencyRatesError::NonPositiveAmount(amount));
        }

        let currency = self.get_price(from, to).await?;
        Ok(amount * currency.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedRate(f64);

    #[async_trait]
    impl CurrencyRates for FixedRate {
        async fn get_price(&self, _from: &str, to: &str) -> CurrencyRatesResult<Currency> {
            Ok(Currency {
                symbol: to.to_owned(),
                price: self.0,
            })
        }
    }

    #[tokio::test]
    async fn test_convert_multiplies_by_price() {
        let rates = FixedRate(2500.0);

        let value = rates.convert("ETH", "USD", 0.8).await.expect("must convert");
        assert!((value - 2000.0).abs() < f64::EPSILON, "0.8 ETH must be worth 2000 USD");
    }

    #[tokio::test]
    async fn test_convert_rejects_non_positive_amounts() {
        let rates = FixedRate(2500.0);

        for amount in [0.0, -0.8, f64::NAN] {
            let err = rates
                .convert("ETH", "USD", amount)
                .await
                .expect_err("non-positive amount must be rejected");
            assert!(matches!(err, CurrencyRatesError::NonPositiveAmount(_)));
        }

        let err = rates.convert("ETH", "USD", -0.8).await.expect_err("must fail");
        assert_eq!(err.to_string(), "amount -0.8 is less than or equal to 0");
    }
}
