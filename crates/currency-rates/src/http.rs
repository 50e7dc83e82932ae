//! Prices read from an HTTP price endpoint.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    config::REQUEST_TIMEOUT,
    errors::{CurrencyRatesError, CurrencyRatesResult},
    rates::{Currency, CurrencyRates},
};

/// Reads prices from an endpoint answering `GET {base_url}?fsym={from}&tsyms={to}` with
/// `{"<to>": <price>}`.
#[derive(Debug, Clone)]
pub struct HttpCurrencyRates {
    client: Client,
    base_url: String,
}

impl HttpCurrencyRates {
    /// Creates a source reading from `base_url`.
    pub fn new(base_url: impl Into<String>) -> CurrencyRatesResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl CurrencyRates for HttpCurrencyRates {
    async fn get_price(&self, from: &str, to: &str) -> CurrencyRatesResult<Currency> {
        trace!(%from, %to, "requesting price");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("fsym", from), ("tsyms", to)])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CurrencyRatesError::Status {
                status: status.as_u16(),
                body: response.text().await?,
            });
        }

        let body = response.json::<Map<String, Value>>().await?;
        parse_price(&body, to)
    }
}

/// Reads the price of `to` out of a price endpoint response.
fn parse_price(body: &Map<String, Value>, to: &str) -> CurrencyRatesResult<Currency> {
    if body.get("Response").and_then(Value::as_str) == Some("Error") {
        let message = body
            .get("Message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(CurrencyRatesError::Source(message.to_owned()));
    }

    let price = body
        .get(to)
        .ok_or_else(|| CurrencyRatesError::MissingPrice(to.to_owned()))?
        .as_f64()
        .ok_or_else(|| CurrencyRatesError::InvalidPrice(to.to_owned()))?;

    Ok(Currency {
        symbol: to.to_owned(),
        price,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("body must be an object"),
        }
    }

    #[test]
    fn test_parse_price() {
        let currency = parse_price(&body(json!({ "BTC": 0.05432 })), "BTC").expect("must parse");

        assert_eq!(currency.symbol, "BTC");
        assert!((currency.price - 0.05432).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_integer_price() {
        let currency = parse_price(&body(json!({ "USD": 2500 })), "USD").expect("must parse");

        assert!((currency.price - 2500.0).abs() < f64::EPSILON, "integers must be read as prices");
    }

    #[test]
    fn test_parse_error_response() {
        let err = parse_price(
            &body(json!({
                "Response": "Error",
                "Message": "cccagg_or_exchange market does not exist for this coin pair (ETHHH-BTC)",
            })),
            "BTC",
        )
        .expect_err("error body must be rejected");

        assert!(matches!(
            err,
            CurrencyRatesError::Source(message)
                if message == "cccagg_or_exchange market does not exist for this coin pair (ETHHH-BTC)"
        ));
    }

    #[test]
    fn test_parse_missing_or_malformed_price() {
        let err = parse_price(&body(json!({ "USD": 1.0 })), "BTC").expect_err("must fail");
        assert!(matches!(err, CurrencyRatesError::MissingPrice(symbol) if symbol == "BTC"));

        let err = parse_price(&body(json!({ "BTC": "cheap" })), "BTC").expect_err("must fail");
        assert!(matches!(err, CurrencyRatesError::InvalidPrice(_)));
    }

    #[test]
    fn test_new_accepts_any_base_url() {
        let rates = HttpCurrencyRates::new("http://127.0.0.1:1/price").expect("must build client");
        assert_eq!(rates.base_url, "http://127.0.0.1:1/price");
    }
}
