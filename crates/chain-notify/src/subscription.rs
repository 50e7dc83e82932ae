//! This module contains the core [`Subscription`] type that consumers of this API will use to
//! observe new events.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of a subscriber within a [`Fanout`](crate::Fanout).
pub type SubscriberId = Uuid;

/// The primary type that consumers of this API will handle. It is created via
/// [`Fanout::subscribe`](crate::Fanout::subscribe). From there you should use it via its
/// [`futures::Stream`] API.
///
/// The stream ends once the producer drops the fanout or removes the subscriber.
#[derive(Debug)]
pub struct Subscription<T> {
    id: SubscriberId,
    receiver: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    /// Intentionally left private so as not to leak implementation details to consuming APIs.
    pub(crate) fn from_receiver(id: SubscriberId, receiver: mpsc::Receiver<T>) -> Subscription<T> {
        Subscription { id, receiver }
    }

    /// Identity under which this subscription is registered.
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl<T> futures::Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
