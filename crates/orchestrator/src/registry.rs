//! The registry of connected chains.
//!
//! The map from network to connector is owned by a single task. Everyone else holds a cloneable
//! [`ConnectorRegistry`] handle and talks to the owner over a channel, each request carrying a
//! oneshot for its reply.

use std::{collections::BTreeMap, sync::Arc};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tricorn_connectors::Connector;
use tricorn_primitives::networks::Network;

use crate::errors::{BridgeError, BridgeResult};

/// Capacity of the command channel of the registry task.
const COMMAND_BUFFER: usize = 32;

/// Counter distinguishing successive registrations of the same network.
pub type Generation = u64;

struct Entry {
    connector: Arc<dyn Connector>,
    generation: Generation,
    chore: CancellationToken,
}

enum Command {
    Add {
        connector: Arc<dyn Connector>,
        chore: CancellationToken,
        reply: oneshot::Sender<BridgeResult<Generation>>,
    },
    Remove {
        network: Network,
        generation: Option<Generation>,
        reply: oneshot::Sender<bool>,
    },
    Lookup {
        network: Network,
        reply: oneshot::Sender<Option<Arc<dyn Connector>>>,
    },
    List {
        reply: oneshot::Sender<Vec<Arc<dyn Connector>>>,
    },
}

/// Handle to the registry task.
#[derive(Debug, Clone)]
pub struct ConnectorRegistry {
    commands: mpsc::Sender<Command>,
}

impl ConnectorRegistry {
    /// Spawns the registry task.
    ///
    /// The task exits once `shutdown` fires or every handle is dropped. Chores of the connectors
    /// still registered at that point are cancelled.
    pub fn spawn(shutdown: CancellationToken) -> (Self, JoinHandle<()>) {
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        let handle = tokio::spawn(run(inbox, shutdown));

        (Self { commands }, handle)
    }

    /// Registers a connector under its network. `chore` is cancelled when the connector leaves
    /// the registry.
    pub async fn add(
        &self,
        connector: Arc<dyn Connector>,
        chore: CancellationToken,
    ) -> BridgeResult<Generation> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Add {
            connector,
            chore,
            reply,
        })
        .await?;

        response.await.map_err(|_| BridgeError::RegistryClosed)?
    }

    /// Removes the connector of `network` and cancels its chore.
    ///
    /// Returns whether a connector was removed.
    pub async fn remove(&self, network: Network) -> BridgeResult<bool> {
        self.remove_inner(network, None).await
    }

    /// Removes the connector of `network` only if it is still the registration `generation`.
    ///
    /// Lets a failing chore drop its own registration without racing a newer one.
    pub async fn remove_generation(
        &self,
        network: Network,
        generation: Generation,
    ) -> BridgeResult<bool> {
        self.remove_inner(network, Some(generation)).await
    }

    async fn remove_inner(
        &self,
        network: Network,
        generation: Option<Generation>,
    ) -> BridgeResult<bool> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Remove {
            network,
            generation,
            reply,
        })
        .await?;

        response.await.map_err(|_| BridgeError::RegistryClosed)
    }

    /// Returns the connector of `network`, if one is registered.
    pub async fn lookup(&self, network: Network) -> BridgeResult<Option<Arc<dyn Connector>>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Lookup { network, reply }).await?;

        response.await.map_err(|_| BridgeError::RegistryClosed)
    }

    /// Returns every registered connector, ordered by network id.
    pub async fn list(&self) -> BridgeResult<Vec<Arc<dyn Connector>>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::List { reply }).await?;

        response.await.map_err(|_| BridgeError::RegistryClosed)
    }

    async fn send(&self, command: Command) -> BridgeResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| BridgeError::RegistryClosed)
    }
}

async fn run(mut inbox: mpsc::Receiver<Command>, shutdown: CancellationToken) {
    // keyed by network id so that listings come out in a stable order.
    let mut entries = BTreeMap::<u32, Entry>::new();
    let mut next_generation: Generation = 0;

    loop {
        let command = tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,
            command = inbox.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            Command::Add {
                connector,
                chore,
                reply,
            } => {
                let network = connector.network().network;
                let result = if entries.contains_key(&network.id()) {
                    Err(BridgeError::AlreadyConnected(network))
                } else {
                    next_generation += 1;
                    entries.insert(
                        network.id(),
                        Entry {
                            connector,
                            generation: next_generation,
                            chore,
                        },
                    );
                    info!(%network, generation = next_generation, "connector registered");
                    Ok(next_generation)
                };

                // the caller may have given up waiting.
                let _ = reply.send(result);
            }
            Command::Remove {
                network,
                generation,
                reply,
            } => {
                let matches = entries
                    .get(&network.id())
                    .is_some_and(|entry| generation.map_or(true, |g| g == entry.generation));

                let removed = matches
                    .then(|| entries.remove(&network.id()))
                    .flatten()
                    .inspect(|entry| {
                        entry.chore.cancel();
                        info!(%network, generation = entry.generation, "connector removed");
                    })
                    .is_some();

                let _ = reply.send(removed);
            }
            Command::Lookup { network, reply } => {
                let connector = entries
                    .get(&network.id())
                    .map(|entry| entry.connector.clone());
                let _ = reply.send(connector);
            }
            Command::List { reply } => {
                let connectors = entries
                    .values()
                    .map(|entry| entry.connector.clone())
                    .collect();
                let _ = reply.send(connectors);
            }
        }
    }

    debug!(remaining = entries.len(), "connector registry stopping");
    for entry in entries.into_values() {
        entry.chore.cancel();
    }
}
