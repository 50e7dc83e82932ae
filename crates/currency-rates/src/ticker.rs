//! Periodic price reads multicast to subscribers.

use std::{sync::Arc, time::Duration};

use chain_notify::{Fanout, FanoutConfig, SubscriberId, Subscription};
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    config::CurrencyRatesConfig,
    rates::{CurrencyRates, TokenPrice},
};

/// Reads the configured token pair from a price source at a fixed interval.
#[derive(Debug)]
pub struct PriceTicker {
    rates: Arc<dyn CurrencyRates>,
    from: String,
    to: String,
    decimals: u32,
    interval: Duration,
    events: Fanout<TokenPrice>,
}

impl PriceTicker {
    /// Creates a ticker over `rates`. Delivery to subscribers stops once `shutdown` fires.
    pub fn new(
        rates: Arc<dyn CurrencyRates>,
        config: &CurrencyRatesConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            rates,
            from: config.from.clone(),
            to: config.to.clone(),
            decimals: config.decimals,
            interval: config.interval(),
            events: Fanout::new(FanoutConfig::default(), shutdown),
        }
    }

    /// Overrides the interval between two reads.
    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Subscription<TokenPrice> {
        self.events.subscribe()
    }

    /// Removes a subscriber, ending its stream.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Reads prices until `cancel` fires.
    ///
    /// A failed read is logged and skipped, nothing is published for it.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(from = %self.from, to = %self.to, interval = ?self.interval, "price ticker started");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let currency = match self.rates.get_price(&self.from, &self.to).await {
                Ok(currency) => currency,
                Err(err) => {
                    error!(from = %self.from, to = %self.to, %err, "could not get currency price");
                    continue;
                }
            };

            let price = TokenPrice {
                symbol: currency.symbol,
                amount: format!("{:.6}", currency.price),
                decimals: self.decimals,
                last_update: Utc::now(),
            };
            let outcome = self.events.notify(price, &cancel).await;
            debug!(?outcome, "published price");
        }

        info!("price ticker stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use futures::StreamExt;
    use parking_lot::Mutex;

    use super::*;
    use crate::{
        errors::{CurrencyRatesError, CurrencyRatesResult},
        rates::Currency,
    };

    /// Answers with the queued prices, failing once the queue is empty.
    #[derive(Debug, Default)]
    struct ScriptedRates {
        answers: Mutex<VecDeque<Option<f64>>>,
        requests: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CurrencyRates for ScriptedRates {
        async fn get_price(&self, from: &str, to: &str) -> CurrencyRatesResult<Currency> {
            self.requests.lock().push((from.to_owned(), to.to_owned()));

            match self.answers.lock().pop_front().flatten() {
                Some(price) => Ok(Currency {
                    symbol: to.to_owned(),
                    price,
                }),
                None => Err(CurrencyRatesError::Source("rate limited".to_owned())),
            }
        }
    }

    #[tokio::test]
    async fn test_ticker_skips_failed_reads() {
        let rates = Arc::new(ScriptedRates {
            answers: Mutex::new(VecDeque::from([Some(0.0004), None, Some(0.00041)])),
            ..Default::default()
        });
        let ticker = Arc::new(
            PriceTicker::new(
                rates.clone(),
                &CurrencyRatesConfig::default(),
                CancellationToken::new(),
            )
            .with_interval(Duration::from_millis(10)),
        );
        let mut prices = ticker.subscribe();

        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let ticker = ticker.clone();
            let cancel = cancel.clone();
            async move { ticker.run(cancel).await }
        });

        let first = prices.next().await.expect("must publish a price");
        let second = prices.next().await.expect("must publish a price");
        assert_eq!(first.symbol, "ETH");
        assert_eq!(first.amount, "0.000400");
        assert_eq!(first.decimals, 18);
        assert_eq!(second.amount, "0.000410", "the failed read must be skipped");
        assert!(second.last_update >= first.last_update);

        cancel.cancel();
        task.await.expect("ticker must not panic");

        let requests = rates.requests.lock().clone();
        assert!(requests.len() >= 3);
        assert!(requests
            .iter()
            .all(|(from, to)| from == "USDT" && to == "ETH"));
    }

    #[tokio::test]
    async fn test_unsubscribe_ends_stream() {
        let ticker = PriceTicker::new(
            Arc::new(ScriptedRates::default()),
            &CurrencyRatesConfig::default(),
            CancellationToken::new(),
        );

        let mut prices = ticker.subscribe();
        assert!(ticker.unsubscribe(prices.id()));
        assert!(prices.next().await.is_none(), "stream must end once unsubscribed");
    }
}
