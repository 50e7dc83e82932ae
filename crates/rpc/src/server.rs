//! The JSON-RPC server shared by the bridge and the signer.

use std::net::SocketAddr;

use anyhow::Context;
use async_trait::async_trait;
use jsonrpsee::{
    server::{ServerBuilder, ServerHandle},
    RpcModule,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tricorn_common::peer::Server;

/// Serves a set of merged RPC modules on one address.
#[derive(Debug)]
pub struct RpcServer {
    addr: String,
    module: RpcModule<()>,
    running: Mutex<Option<(ServerHandle, SocketAddr)>>,
}

impl RpcServer {
    /// Creates a server for `addr` without any method.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            module: RpcModule::new(()),
            running: Mutex::new(None),
        }
    }

    /// Adds the methods of `module`.
    pub fn with_module<Ctx: Send + Sync + 'static>(
        mut self,
        name: &str,
        module: RpcModule<Ctx>,
    ) -> anyhow::Result<Self> {
        self.module
            .merge(module)
            .with_context(|| format!("merge {name} api"))?;

        Ok(self)
    }

    /// Binds the listener and starts serving, returning the bound address.
    ///
    /// Starting a running server is a no-op.
    pub async fn start(&self) -> anyhow::Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some((_, local_addr)) = running.as_ref() {
            debug!(%local_addr, "rpc server already running");
            return Ok(*local_addr);
        }

        info!(addr = %self.addr, "starting rpc server");
        let server = ServerBuilder::new()
            .build(&self.addr)
            .await
            .with_context(|| format!("bind rpc server to {}", self.addr))?;
        let local_addr = server.local_addr().context("read bound address")?;

        *running = Some((server.start(self.module.clone()), local_addr));
        debug!(%local_addr, "rpc server started");

        Ok(local_addr)
    }
}

#[async_trait]
impl Server for RpcServer {
    async fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        self.start().await?;

        let handle = self
            .running
            .lock()
            .await
            .as_ref()
            .map(|(handle, _)| handle.clone());
        match handle {
            Some(handle) => tokio::select! {
                _ = cancel.cancelled() => Ok(()),
                _ = handle.stopped() => anyhow::bail!("rpc server stopped unexpectedly"),
            },
            None => Ok(()),
        }
    }

    async fn close(&self) -> anyhow::Result<()> {
        let Some((handle, _)) = self.running.lock().await.take() else {
            return Ok(());
        };

        info!(addr = %self.addr, "stopping rpc server");
        if handle.stop().is_err() {
            warn!("rpc server already stopped");
        }
        handle.stopped().await;

        Ok(())
    }
}
