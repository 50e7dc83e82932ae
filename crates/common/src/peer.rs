//! Supervision of the parts a bridge service is made of.
//!
//! A [`Peer`] runs its [`Server`] until the root cancellation token fires, then closes its parts in
//! reverse order of dependency: the connector service first, then the server, then the
//! communication layer. Close failures are collected rather than short-circuited so that every
//! part gets a chance to release its resources.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors of a [`Peer`].
#[derive(Debug, Error)]
pub enum PeerError {
    /// The server stopped with an error before shutdown was requested.
    #[error("{name} failed: {reason:#}")]
    Run {
        /// Name of the peer.
        name: String,
        /// Why the server stopped.
        reason: anyhow::Error,
    },

    /// One or more parts could not be closed.
    #[error("could not close {name}: {}", display_all(.errors))]
    Close {
        /// Name of the peer.
        name: String,
        /// Every close failure, in close order.
        errors: Vec<anyhow::Error>,
    },
}

fn display_all(errors: &[anyhow::Error]) -> String {
    errors
        .iter()
        .map(|e| format!("{e:#}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Transport to the services a peer depends on, e.g. the signer.
#[async_trait]
pub trait Communication: Debug + Send + Sync {
    /// Releases the transport.
    async fn close(&self) -> anyhow::Result<()>;
}

/// The chain connectors of a peer.
#[async_trait]
pub trait ConnectorService: Debug + Send + Sync {
    /// Drops the connections to the chain nodes.
    async fn close_client(&self);
}

/// The network server of a peer.
#[async_trait]
pub trait Server: Debug + Send + Sync {
    /// Serves until `cancel` fires or serving fails.
    async fn run(&self, cancel: CancellationToken) -> anyhow::Result<()>;

    /// Releases the listener.
    async fn close(&self) -> anyhow::Result<()>;
}

/// A service process made of optional parts.
#[derive(Debug)]
pub struct Peer {
    name: String,
    communication: Option<Arc<dyn Communication>>,
    service: Option<Arc<dyn ConnectorService>>,
    server: Option<Arc<dyn Server>>,
}

impl Peer {
    /// Creates a peer without any part.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            communication: None,
            service: None,
            server: None,
        }
    }

    /// Sets the communication layer.
    pub fn with_communication(self, communication: Arc<dyn Communication>) -> Self {
        Self {
            communication: Some(communication),
            ..self
        }
    }

    /// Sets the connector service.
    pub fn with_connector_service(self, service: Arc<dyn ConnectorService>) -> Self {
        Self {
            service: Some(service),
            ..self
        }
    }

    /// Sets the network server.
    pub fn with_server(self, server: Arc<dyn Server>) -> Self {
        Self {
            server: Some(server),
            ..self
        }
    }

    /// Runs the peer until `cancel` fires.
    ///
    /// Cancellation is a clean exit. A server that stops with an error cancels the peer.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), PeerError> {
        debug!(name = %self.name, "tricorn peer running");

        let Some(server) = &self.server else {
            cancel.cancelled().await;
            return Ok(());
        };

        let result = tokio::select! {
            result = server.run(cancel.clone()) => result,
            _ = cancel.cancelled() => Ok(()),
        };

        match result {
            Err(reason) if !cancel.is_cancelled() => {
                cancel.cancel();
                Err(PeerError::Run {
                    name: self.name.clone(),
                    reason,
                })
            }
            Err(err) => {
                debug!(name = %self.name, %err, "server stopped during shutdown");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Closes every part, collecting the failures.
    pub async fn close(&self) -> Result<(), PeerError> {
        debug!(name = %self.name, "tricorn peer closing");

        if let Some(service) = &self.service {
            service.close_client().await;
        }

        let mut errors = Vec::new();
        if let Some(server) = &self.server {
            if let Err(err) = server.close().await {
                errors.push(err);
            }
        }
        if let Some(communication) = &self.communication {
            if let Err(err) = communication.close().await {
                errors.push(err);
            }
        }

        if errors.is_empty() {
            return Ok(());
        }

        let err = PeerError::Close {
            name: self.name.clone(),
            errors,
        };
        error!(%err, "could not close peer");
        Err(err)
    }
}

/// Cancels `cancel` once the process receives SIGINT or SIGTERM.
pub fn cancel_on_signal(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => return,
            signal = shutdown_signal() => {
                if let Err(err) = signal {
                    warn!(%err, "could not listen for shutdown signals");
                    return;
                }
            }
        }

        info!("shutdown signal received");
        cancel.cancel();
    })
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;

    use super::*;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    #[derive(Debug)]
    struct Part {
        name: &'static str,
        log: Log,
        fail_close: bool,
        fail_run: bool,
    }

    impl Part {
        fn new(name: &'static str, log: &Log) -> Arc<Self> {
            Arc::new(Self {
                name,
                log: log.clone(),
                fail_close: false,
                fail_run: false,
            })
        }

        fn failing(name: &'static str, log: &Log) -> Arc<Self> {
            Arc::new(Self {
                name,
                log: log.clone(),
                fail_close: true,
                fail_run: true,
            })
        }

        fn closed(&self) -> anyhow::Result<()> {
            self.log.lock().expect("must lock").push(self.name);
            if self.fail_close {
                return Err(anyhow!("{} refused to close", self.name));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Communication for Part {
        async fn close(&self) -> anyhow::Result<()> {
            self.closed()
        }
    }

    #[async_trait]
    impl ConnectorService for Part {
        async fn close_client(&self) {
            self.log.lock().expect("must lock").push(self.name);
        }
    }

    #[async_trait]
    impl Server for Part {
        async fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
            if self.fail_run {
                return Err(anyhow!("address in use"));
            }
            cancel.cancelled().await;
            Ok(())
        }

        async fn close(&self) -> anyhow::Result<()> {
            self.closed()
        }
    }

    #[tokio::test]
    async fn test_close_order() {
        let log = Log::default();
        let peer = Peer::new("bridge")
            .with_communication(Part::new("communication", &log))
            .with_connector_service(Part::new("connectors", &log))
            .with_server(Part::new("server", &log));

        peer.close().await.expect("must close");

        assert_eq!(
            *log.lock().expect("must lock"),
            vec!["connectors", "server", "communication"],
            "parts must close in reverse order of dependency"
        );
    }

    #[tokio::test]
    async fn test_close_collects_every_failure() {
        let log = Log::default();
        let peer = Peer::new("bridge")
            .with_communication(Part::failing("communication", &log))
            .with_server(Part::failing("server", &log));

        let err = peer.close().await.expect_err("close must fail");
        match err {
            PeerError::Close { errors, .. } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            *log.lock().expect("must lock"),
            vec!["server", "communication"],
            "a failing part must not keep the others open"
        );
    }

    #[tokio::test]
    async fn test_cancellation_is_clean_exit() {
        let log = Log::default();
        let peer = Peer::new("signer").with_server(Part::new("server", &log));

        let cancel = CancellationToken::new();
        cancel.cancel();
        peer.run(cancel.clone())
            .await
            .expect("cancellation must not be an error");

        Peer::new("empty")
            .run(cancel)
            .await
            .expect("peer without server must wait for cancellation");
    }

    #[tokio::test]
    async fn test_server_failure_cancels_peer() {
        let log = Log::default();
        let peer = Peer::new("bridge").with_server(Part::failing("server", &log));

        let cancel = CancellationToken::new();
        let err = peer
            .run(cancel.clone())
            .await
            .expect_err("server failure must be reported");

        assert!(matches!(err, PeerError::Run { .. }));
        assert!(cancel.is_cancelled(), "failure must cancel the root token");
    }

    #[tokio::test]
    async fn test_signal_task_stops_with_token() {
        let cancel = CancellationToken::new();
        let handle = cancel_on_signal(cancel.clone());

        cancel.cancel();
        handle.await.expect("signal task must not panic");
    }
}
