//! Errors of the price sources.

use thiserror::Error;

/// Errors while reading prices.
#[derive(Debug, Error)]
pub enum CurrencyRatesError {
    /// The price source could not be reached or answered garbage.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// The price source answered with a non-success status.
    #[error("price source answered {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Body of the response.
        body: String,
    },

    /// The price source reported an error in its body.
    #[error("price source error: {0}")]
    Source(String),

    /// The response carries no price for the requested symbol.
    #[error("token {0} does not exist")]
    MissingPrice(String),

    /// The price of the requested symbol is not a number.
    #[error("token price {0} is not a number")]
    InvalidPrice(String),

    /// Amounts to convert must be positive.
    #[error("amount {0} is less than or equal to 0")]
    NonPositiveAmount(f64),
}

/// Result of price operations.
pub type CurrencyRatesResult<T> = Result<T, CurrencyRatesError>;
