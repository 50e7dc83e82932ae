//! Shared test helpers for the orchestrator crate.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chain_notify::{Fanout, FanoutConfig, SubscriberId, Subscription};
use ethnum::U256;
use parking_lot::Mutex;
use sqlx::sqlite::SqlitePoolOptions;
use tokio_util::sync::CancellationToken;
use tricorn_connectors::{
    BridgeInSignature, BridgeInSignatureRequest, BridgeOutRequest, CancelSignatureRequest,
    Connector, ConnectorError, ConnectorResult, Estimation,
};
use tricorn_db::{
    networks::{NetworkToken, NetworkTokenDb, TokenDb},
    persistent::{config::DbConfig, sqlite::SqliteDb},
    MIGRATOR,
};
use tricorn_primitives::{
    codec::{bytes_to_string, string_to_bytes},
    events::{CrossChainAddress, Event, FundsIn, FundsOut, TransactionInfo},
    networks::{Network, NetworkDescriptor},
};

/// `0x7e0f…7446`.
pub(crate) const DEPOSIT_SENDER: [u8; 20] = [
    0x7e, 0x0f, 0x9d, 0x7a, 0x2c, 0x3b, 0x4e, 0x51, 0xa6, 0xf0, 0x8d, 0x13, 0xc2, 0xb9, 0xe4, 0xf7,
    0x1a, 0x63, 0x74, 0x46,
];

/// USDT on Goerli, `0x9fF6…29ec`.
pub(crate) const GOERLI_USDT: [u8; 20] = [
    0x9f, 0xf6, 0x34, 0x5e, 0x8b, 0x0c, 0x71, 0xd2, 0x4a, 0x93, 0xe5, 0x06, 0xb8, 0x1f, 0xc7, 0x5d,
    0x20, 0x6a, 0x29, 0xec,
];

pub(crate) const SOLANA_USDT: [u8; 32] = [0x5c; 32];

pub(crate) const CASPER_USDT: [u8; 32] = [0xc5; 32];

pub(crate) const DEPOSIT_TX: [u8; 32] = [0xd4; 32];

pub(crate) const DEPOSIT_AMOUNT: U256 = U256::new(1_000_000_000_000_000_000_000);

pub(crate) const SOLANA_RECIPIENT: &str = "4zXwdbUDWo1S5AP2CEfv4zAPRds5PQUG1dyqLLvib2xu";

/// Fee reported by [`MockConnector::estimate_transfer`].
pub(crate) const MOCK_FEE: u64 = 1000;

/// How long tests wait for background tasks.
pub(crate) const WAIT: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds, failing the test after [`WAIT`].
pub(crate) async fn wait_for<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(WAIT, async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition must hold in time");
}

/// Opens a migrated in-memory store.
pub(crate) async fn test_db() -> Arc<SqliteDb> {
    // a single connection that never recycles, every connection to `:memory:` is a new database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("must open in-memory database");
    MIGRATOR.run(&pool).await.expect("must migrate");

    Arc::new(SqliteDb::new(pool, DbConfig::default()))
}

/// Registers USDT on Goerli, Solana and the Casper testnet and returns its id.
pub(crate) async fn seed_usdt(db: &SqliteDb) -> i64 {
    let token_id = db
        .create_token("USDT", "Tether USD")
        .await
        .expect("must create token");

    let contracts = [
        (Network::Goerli, GOERLI_USDT.to_vec(), 18),
        (Network::Solana, SOLANA_USDT.to_vec(), 6),
        (Network::CasperTest, CASPER_USDT.to_vec(), 18),
    ];
    for (network, contract_address, decimals) in contracts {
        db.put_network_token(&NetworkToken {
            network_id: network.id(),
            token_id,
            contract_address,
            decimals,
        })
        .await
        .expect("must register network token");
    }

    token_id
}

/// A USDT deposit on Goerli towards [`SOLANA_RECIPIENT`].
pub(crate) fn deposit_from(sender: [u8; 20], tx_hash: [u8; 32], block: u64) -> Event {
    Event::FundsIn(FundsIn {
        from: sender.to_vec(),
        to: CrossChainAddress {
            network_name: Network::Solana.name().to_owned(),
            address: SOLANA_RECIPIENT.to_owned(),
        },
        amount: DEPOSIT_AMOUNT,
        token: GOERLI_USDT.to_vec(),
        tx: TransactionInfo {
            hash: tx_hash.to_vec(),
            block_number: block,
            sender: sender.to_vec(),
        },
    })
}

/// The deposit of [`DEPOSIT_SENDER`] in [`DEPOSIT_TX`].
pub(crate) fn deposit_event(block: u64) -> Event {
    deposit_from(DEPOSIT_SENDER, DEPOSIT_TX, block)
}

/// The Solana release matching [`deposit_event`], observed in `tx_hash`.
pub(crate) fn release_event(tx_hash: Vec<u8>, block: u64) -> Event {
    Event::FundsOut(FundsOut {
        from: CrossChainAddress {
            network_name: Network::Goerli.name().to_owned(),
            address: bytes_to_string(Network::Goerli, &DEPOSIT_SENDER),
        },
        to: string_to_bytes(Network::Solana, SOLANA_RECIPIENT).expect("must decode"),
        amount: DEPOSIT_AMOUNT,
        token: SOLANA_USDT.to_vec(),
        tx: TransactionInfo {
            hash: tx_hash,
            block_number: block,
            sender: vec![0xab; 32],
        },
    })
}

/// A connector that records what it is asked to do.
///
/// Events queued with [`MockConnector::with_backlog`] are published by every `read_events` that
/// starts at or before their block, everything else is pushed with [`MockConnector::emit`].
#[derive(Debug)]
pub(crate) struct MockConnector {
    descriptor: NetworkDescriptor,
    events: Fanout<Event>,
    backlog: Mutex<Vec<Event>>,
    read_from: Mutex<Vec<u64>>,
    bridge_outs: Mutex<Vec<BridgeOutRequest>>,
    hashes: Mutex<Vec<Vec<u8>>>,
    cancels: Mutex<Vec<CancelSignatureRequest>>,
    fail_bridge_out: AtomicBool,
}

impl MockConnector {
    pub(crate) fn new(network: Network) -> Self {
        Self {
            descriptor: NetworkDescriptor {
                network,
                node_address: "http://localhost:0".to_owned(),
                token_contract: String::new(),
                bridge_contract: bytes_to_string(network, &[0xab; 32]),
                gas_limit: 0,
            },
            events: Fanout::new(FanoutConfig::default(), CancellationToken::new()),
            backlog: Mutex::new(Vec::new()),
            read_from: Mutex::new(Vec::new()),
            bridge_outs: Mutex::new(Vec::new()),
            hashes: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            fail_bridge_out: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_backlog(self, events: Vec<Event>) -> Self {
        *self.backlog.lock() = events;
        self
    }

    pub(crate) fn with_bridge_contract(mut self, bridge_contract: &str) -> Self {
        bridge_contract.clone_into(&mut self.descriptor.bridge_contract);
        self
    }

    pub(crate) fn fail_bridge_out(&self, fail: bool) {
        self.fail_bridge_out.store(fail, Ordering::SeqCst);
    }

    /// Publishes `event` to the current subscribers.
    pub(crate) async fn emit(&self, event: Event) {
        self.events.notify(event, &CancellationToken::new()).await;
    }

    /// Drops every subscriber, which ends their streams.
    pub(crate) fn close_streams(&self) {
        for id in self.events.subscriber_ids() {
            self.events.unsubscribe(id);
        }
    }

    pub(crate) fn num_subscribers(&self) -> usize {
        self.events.num_subscribers()
    }

    pub(crate) fn read_from(&self) -> Vec<u64> {
        self.read_from.lock().clone()
    }

    pub(crate) fn bridge_out_requests(&self) -> Vec<BridgeOutRequest> {
        self.bridge_outs.lock().clone()
    }

    pub(crate) fn submitted_hashes(&self) -> Vec<Vec<u8>> {
        self.hashes.lock().clone()
    }

    pub(crate) fn cancel_requests(&self) -> Vec<CancelSignatureRequest> {
        self.cancels.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn network(&self) -> &NetworkDescriptor {
        &self.descriptor
    }

    fn subscribe(&self) -> Subscription<Event> {
        self.events.subscribe()
    }

    fn unsubscribe(&self, id: SubscriberId) {
        self.events.unsubscribe(id);
    }

    async fn read_events(
        &self,
        from_block: u64,
        cancel: CancellationToken,
    ) -> ConnectorResult<()> {
        self.read_from.lock().push(from_block);

        let backlog = self.backlog.lock().clone();
        for event in backlog
            .into_iter()
            .filter(|event| event.block() >= from_block)
        {
            self.events.notify(event, &cancel).await;
        }

        cancel.cancelled().await;
        Ok(())
    }

    async fn bridge_out(&self, req: BridgeOutRequest) -> ConnectorResult<Vec<u8>> {
        if self.fail_bridge_out.load(Ordering::SeqCst) {
            return Err(ConnectorError::UnexpectedResponse(
                "node refused the transaction".to_owned(),
            ));
        }

        let mut hash = vec![0xb0; 32];
        hash[..8].copy_from_slice(&req.nonce.to_be_bytes());

        self.bridge_outs.lock().push(req);
        self.hashes.lock().push(hash.clone());

        Ok(hash)
    }

    async fn estimate_transfer(&self) -> ConnectorResult<Estimation> {
        Ok(Estimation {
            fee: MOCK_FEE.to_string(),
            fee_percentage: "0.4".to_owned(),
            estimated_confirmation: 60,
        })
    }

    async fn bridge_in_signature(
        &self,
        req: BridgeInSignatureRequest,
    ) -> ConnectorResult<BridgeInSignature> {
        // gives concurrent requests a chance to interleave.
        tokio::task::yield_now().await;

        Ok(BridgeInSignature {
            token: req.token,
            amount: req.amount,
            gas_commission: req.gas_commission,
            destination: req.destination,
            deadline: 0,
            nonce: req.nonce,
            signature: req.nonce.to_be_bytes().to_vec(),
        })
    }

    async fn cancel_signature(&self, req: CancelSignatureRequest) -> ConnectorResult<Vec<u8>> {
        let signature = req.nonce.to_be_bytes().to_vec();
        self.cancels.lock().push(req);

        Ok(signature)
    }
}
