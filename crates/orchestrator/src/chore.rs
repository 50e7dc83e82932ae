//! The task that feeds the events of one connector to the handlers.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tricorn_connectors::Connector;
use tricorn_db::BridgeDb;
use tricorn_primitives::{events::Event, networks::Network};

use crate::{
    errors::{BridgeError, BridgeResult},
    handlers::EventHandler,
    registry::{ConnectorRegistry, Generation},
};

/// Everything a chore needs, moved into its task.
#[derive(Debug)]
pub(crate) struct Chore<D> {
    pub(crate) db: Arc<D>,
    pub(crate) handler: Arc<EventHandler<D>>,
    pub(crate) registry: ConnectorRegistry,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) generation: Generation,
}

impl<D: BridgeDb> Chore<D> {
    /// Reads the connector's events from the persisted watermark until `cancel` fires.
    ///
    /// A failure removes the connector from the registry so that the reconnect loop can bring it
    /// back. Cancellation is a clean exit.
    pub(crate) async fn run(self, cancel: CancellationToken) -> BridgeResult<()> {
        let network = self.connector.network().network;

        let result = self.read(network, &cancel).await;
        if let Err(err) = &result {
            error!(%network, %err, "chore failed, dropping connector");

            if let Err(err) = self
                .registry
                .remove_generation(network, self.generation)
                .await
            {
                warn!(%network, %err, "could not drop connector");
            }
        }

        result
    }

    async fn read(&self, network: Network, cancel: &CancellationToken) -> BridgeResult<()> {
        let from_block = match self.db.last_seen_block(network.id()).await? {
            Some(block) => block,
            None => {
                self.db.set_last_seen_block(network.id(), 0).await?;
                0
            }
        };

        let mut events = self.connector.subscribe();
        let subscriber = events.id();
        info!(%network, from_block, %subscriber, "reading events");

        let reader = async {
            self.connector
                .read_events(from_block, cancel.clone())
                .await
                .map_err(BridgeError::from)
        };

        let receiver = async {
            let mut held = None;
            loop {
                let event = tokio::select! {
                    biased;

                    _ = cancel.cancelled() => return Ok(()),
                    event = events.next() => event,
                };

                match event {
                    Some(event) => self.process(network, &event, &mut held).await?,
                    None => return Err(BridgeError::EventsChannelClosed(network)),
                }
            }
        };

        let result = tokio::try_join!(reader, receiver).map(|_| ());
        self.connector.unsubscribe(subscriber);

        result
    }

    /// Handles one event and moves the watermark.
    ///
    /// `held` is the lowest block with an event that failed. The watermark never passes it, so
    /// the next read of the chain replays that event and everything after it.
    async fn process(
        &self,
        network: Network,
        event: &Event,
        held: &mut Option<u64>,
    ) -> BridgeResult<()> {
        let block = event.block();

        match self.handler.handle(network, event).await {
            Ok(()) => {}
            Err(err) if !err.is_retryable() => {
                warn!(%network, block, %err, "skipping event that can never be handled");
            }
            Err(err) => {
                error!(%network, block, %err, "could not handle event, holding the watermark");
                *held = Some(held.map_or(block, |failed| failed.min(block)));
            }
        }

        let watermark = held.map_or(block, |failed| failed.min(block));
        self.db.set_last_seen_block(network.id(), watermark).await?;

        Ok(())
    }
}
