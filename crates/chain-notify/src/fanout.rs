//! The [`Fanout`] registry and its dispatch loop.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{
    config::FanoutConfig,
    subscription::{SubscriberId, Subscription},
};

struct Subscriber<T> {
    id: SubscriberId,
    outbox: mpsc::Sender<T>,
}

// Manual impl so that `T` is not required to be `Debug`.
impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("closed", &self.outbox.is_closed())
            .finish()
    }
}

/// Result of a [`Fanout::notify`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The event was handed to this many live subscribers.
    Delivered(usize),
    /// Dispatch stopped early because shutdown was requested.
    Cancelled,
}

/// Registry of subscribers of a single producer.
///
/// Cloning is cheap and yields a handle to the same registry.
pub struct Fanout<T> {
    /// Guards only the list itself; never held across an await point.
    subscribers: Arc<Mutex<Vec<Subscriber<T>>>>,

    /// Held across every write of a single `notify` so concurrent calls don't interleave.
    dispatch: Arc<tokio::sync::Mutex<()>>,

    config: FanoutConfig,

    shutdown: CancellationToken,
}

impl<T> Clone for Fanout<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: self.subscribers.clone(),
            dispatch: self.dispatch.clone(),
            config: self.config,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T> fmt::Debug for Fanout<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fanout")
            .field("subscribers", &*self.subscribers.lock())
            .field("config", &self.config)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl<T: Clone + Send> Fanout<T> {
    /// Creates an empty registry. Dispatch stops as soon as `shutdown` is cancelled.
    pub fn new(config: FanoutConfig, shutdown: CancellationToken) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            dispatch: Arc::new(tokio::sync::Mutex::new(())),
            config,
            shutdown,
        }
    }

    /// Registers a new subscriber and returns its end of the channel.
    pub fn subscribe(&self) -> Subscription<T> {
        let (outbox, receiver) = mpsc::channel(self.config.channel_capacity());
        let id = Uuid::new_v4();

        trace!(%id, "adding subscriber");
        self.subscribers.lock().push(Subscriber { id, outbox });

        Subscription::from_receiver(id, receiver)
    }

    /// Removes the subscriber with the given id, keeping the order of the others.
    ///
    /// Returns whether a subscriber was removed. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|sub| sub.id != id);
        let removed = subscribers.len() != before;
        drop(subscribers); // dropped eagerly to allow other threads to progress immediately.

        trace!(%id, %removed, "removing subscriber");
        removed
    }

    /// Ids of the registered subscribers in registration order.
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subscribers.lock().iter().map(|sub| sub.id).collect()
    }

    /// Number of registered subscribers.
    pub fn num_subscribers(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Sends `event` to every subscriber in registration order.
    ///
    /// Waits for room in each subscriber's channel. Returns [`NotifyOutcome::Cancelled`] without
    /// further writes once either the registry's shutdown token or `cancel` fires. Subscribers
    /// whose receiving half has been dropped are pruned.
    pub async fn notify(&self, event: T, cancel: &CancellationToken) -> NotifyOutcome {
        let _dispatch = self.dispatch.lock().await;

        let targets = self
            .subscribers
            .lock()
            .iter()
            .map(|sub| (sub.id, sub.outbox.clone()))
            .collect::<Vec<_>>();

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, outbox) in targets {
            if outbox.capacity() == 0 {
                debug!(%id, "subscriber is lagging, waiting for room");
            }

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => return NotifyOutcome::Cancelled,
                _ = cancel.cancelled() => return NotifyOutcome::Cancelled,
                res = outbox.send(event.clone()) => match res {
                    Ok(()) => delivered += 1,
                    // the receiver has been dropped.
                    Err(_) => closed.push(id),
                },
            }
        }

        if !closed.is_empty() {
            debug!(?closed, "pruning closed subscribers");
            self.subscribers
                .lock()
                .retain(|sub| !closed.contains(&sub.id));
        }

        NotifyOutcome::Delivered(delivered)
    }
}
