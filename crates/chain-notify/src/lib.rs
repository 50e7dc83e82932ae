//! Per-producer multicast of events to a dynamic set of subscribers.
//!
//! A producer (a chain connector, the currency-rate ticker) owns a [`Fanout`]. Consumers call
//! [`Fanout::subscribe`] and work with the returned [`Subscription`] through its
//! [`futures::Stream`] API. Every subscriber has its own bounded channel: a slow consumer stalls
//! [`Fanout::notify`] instead of making the producer buffer without limit.

pub mod config;
pub mod fanout;
pub mod subscription;

pub use config::FanoutConfig;
pub use fanout::{Fanout, NotifyOutcome};
pub use subscription::{SubscriberId, Subscription};
