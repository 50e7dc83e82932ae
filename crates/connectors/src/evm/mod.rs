//! Connector of EVM-family chains.
//!
//! Events are read with `eth_getLogs` over the bridge contract. Historical ranges are split into
//! chunks of at most [`LISTENING_LIMIT`](config::LISTENING_LIMIT) blocks. The live tail polls
//! `eth_blockNumber` and reads the blocks past the last watermark. A batch that contains a removed
//! log is dropped as a whole and the watermark stays put, so the next tick re-reads it.

pub mod config;
pub mod contract;
pub mod logs;
pub mod rpc;
pub mod signatures;

use std::sync::Arc;

use alloy::{
    consensus::{SignableTransaction, TxEnvelope, TxLegacy},
    eips::eip2718::Encodable2718,
    network::TransactionBuilder,
    primitives::{Address, Bytes, TxKind},
    rpc::types::{Filter, TransactionRequest},
    sol_types::SolCall,
};
use async_trait::async_trait;
use chain_notify::{Fanout, NotifyOutcome, SubscriberId, Subscription};
use chrono::Utc;
use ethnum::U256;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tricorn_primitives::{
    codec::decode_address,
    crypto::evm::address_from_public_key,
    events::Event,
    networks::{NetworkDescriptor, NetworkType},
};
use tricorn_signer::{BridgeSigner, KeyUsage};

use self::{
    config::{EvmConfig, LISTENING_LIMIT},
    contract::{bridgeOutCall, to_address, to_word},
    logs::{parse_log, EventTopics},
    rpc::EvmRpc,
    signatures::{sign_packed, transaction_signature, BridgeInPayload, CancelPayload},
};
use crate::{
    errors::{ConnectorError, ConnectorResult},
    splitter::{split_range, BlockRange},
    traits::{
        BridgeInSignature, BridgeInSignatureRequest, BridgeOutRequest, CancelSignatureRequest,
        Connector, Estimation,
    },
};

/// Decimals of the native coin of every EVM chain.
const NATIVE_DECIMALS: u32 = 18;

/// Renders `value` scaled down by `10^decimals` as a plain decimal string.
pub(crate) fn format_units(value: U256, decimals: u32) -> String {
    let unit = U256::from(10u8).pow(decimals);
    let integer = value / unit;
    let fraction = value % unit;
    if fraction == U256::ZERO {
        return integer.to_string();
    }

    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{integer}.{}", fraction.trim_end_matches('0'))
}

/// A connected EVM chain.
#[derive(Debug)]
pub struct EvmConnector<R> {
    config: EvmConfig,
    descriptor: NetworkDescriptor,
    bridge_contract: Address,
    topics: EventTopics,
    rpc: R,
    signer: Arc<dyn BridgeSigner>,
    fanout: Fanout<Event>,
}

impl<R: EvmRpc> EvmConnector<R> {
    /// Creates a connector. Fails if the configured contract or topics do not decode.
    pub fn new(
        config: EvmConfig,
        rpc: R,
        signer: Arc<dyn BridgeSigner>,
        fanout: Fanout<Event>,
    ) -> ConnectorResult<Self> {
        if config.chain_name.network_type() != NetworkType::Evm {
            return Err(ConnectorError::InvalidConfig(format!(
                "{} is not an EVM network",
                config.chain_name
            )));
        }

        let bridge_contract = config.bridge_contract()?;
        let topics = config.event_topics()?;
        let descriptor = NetworkDescriptor {
            network: config.chain_name,
            node_address: config.node_address.clone(),
            token_contract: config.bridge_contract_address.clone(),
            bridge_contract: config.bridge_contract_address.clone(),
            gas_limit: config.gas_limit,
        };

        Ok(Self {
            config,
            descriptor,
            bridge_contract,
            topics,
            rpc,
            signer,
            fanout,
        })
    }

    /// The node client.
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Checks that the node serves the configured chain.
    pub async fn check_chain_id(&self) -> ConnectorResult<()> {
        let chain_id = self.rpc.chain_id().await?;
        if chain_id != self.config.chain_id {
            return Err(ConnectorError::InvalidConfig(format!(
                "node serves chain {chain_id}, expected {}",
                self.config.chain_id
            )));
        }

        Ok(())
    }

    /// Reads and publishes the bridge events of `range`.
    ///
    /// The batch is parsed in full before anything is published, so a removed log leaves
    /// subscribers untouched. Returns `false` if publishing stopped because of cancellation.
    async fn publish_range(
        &self,
        range: BlockRange,
        cancel: &CancellationToken,
    ) -> ConnectorResult<bool> {
        let filter = Filter::new()
            .address(self.bridge_contract)
            .event_signature(self.topics.as_filter())
            .from_block(range.from)
            .to_block(range.to);
        let logs = self.rpc.get_logs(&filter).await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            match parse_log(log, &self.topics) {
                Ok(event) => events.push(event),
                Err(ConnectorError::UnknownLogType(topic)) => {
                    warn!(network = %self.descriptor.network, %topic, "skipping log of unknown type");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(network = %self.descriptor.network, from = range.from, to = range.to, events = events.len(), "publishing events");
        for event in events {
            if matches!(self.fanout.notify(event, cancel).await, NotifyOutcome::Cancelled) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Publishes every event of `[from, to]`, chunk by chunk.
    pub async fn backfill(
        &self,
        from: u64,
        to: u64,
        cancel: &CancellationToken,
    ) -> ConnectorResult<()> {
        for range in split_range(BlockRange::new(from, to), LISTENING_LIMIT)? {
            if cancel.is_cancelled() || !self.publish_range(range, cancel).await? {
                return Ok(());
            }
        }

        info!(network = %self.descriptor.network, from, to, "historical events read");
        Ok(())
    }

    /// Runs one live tail step and returns the new watermark, the last fully published block.
    ///
    /// The watermark only moves once every event up to the current block has been published.
    pub async fn advance(&self, watermark: u64, cancel: &CancellationToken) -> ConnectorResult<u64> {
        let current = self.rpc.block_number().await?;
        if current <= watermark {
            return Ok(watermark);
        }

        if self
            .publish_range(BlockRange::new(watermark + 1, current), cancel)
            .await?
        {
            Ok(current)
        } else {
            Ok(watermark)
        }
    }

    async fn tail(&self, cancel: &CancellationToken) -> ConnectorResult<()> {
        let start = self.rpc.block_number().await?;
        let mut watermark = start.saturating_sub(1);

        let mut ticker = interval(self.config.events_reading_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // the first tick completes immediately and reads the block we started at.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            match self.advance(watermark, cancel).await {
                Ok(next) => watermark = next,
                Err(ConnectorError::BlockchainRework) => {
                    warn!(network = %self.descriptor.network, watermark, "blockchain rework, batch dropped");
                }
                Err(e) => {
                    warn!(network = %self.descriptor.network, %e, "could not read real time events");
                }
            }
        }
    }
}

#[async_trait]
impl<R: EvmRpc> Connector for EvmConnector<R> {
    fn network(&self) -> &NetworkDescriptor {
        &self.descriptor
    }

    fn subscribe(&self) -> Subscription<Event> {
        self.fanout.subscribe()
    }

    fn unsubscribe(&self, id: SubscriberId) {
        self.fanout.unsubscribe(id);
    }

    async fn read_events(&self, from_block: u64, cancel: CancellationToken) -> ConnectorResult<()> {
        let current = self.rpc.block_number().await?;
        info!(network = %self.descriptor.network, from_block, current, "reading events");

        let backfill = async {
            if from_block == 0 || from_block > current {
                return;
            }

            if let Err(e) = self.backfill(from_block, current, &cancel).await {
                error!(network = %self.descriptor.network, %e, "could not read past events");
            }
        };

        let tail = async {
            if let Err(e) = self.tail(&cancel).await {
                error!(network = %self.descriptor.network, %e, "could not read real time events");
            }
        };

        tokio::join!(backfill, tail);
        Ok(())
    }

    async fn bridge_out(&self, req: BridgeOutRequest) -> ConnectorResult<Vec<u8>> {
        let public_key = self.signer.public_key(NetworkType::Evm).await?;
        let owner = Address::from(address_from_public_key(&public_key)?);

        let input = Bytes::from(
            bridgeOutCall {
                token: to_address(&req.token)?,
                recipient: to_address(&req.to)?,
                amount: to_word(req.amount),
                transactionId: to_word(req.transaction_id),
                sourceChain: req.from.network_name.clone(),
                sourceAddress: req.from.address.clone(),
            }
            .abi_encode(),
        );
        let request = TransactionRequest::default()
            .with_from(owner)
            .with_to(self.bridge_contract)
            .with_input(input.clone());

        let estimated_gas = self.rpc.estimate_gas(&request).await?;
        let gas_price = self.rpc.gas_price().await?;
        let nonce = self.rpc.transaction_count(owner).await?;

        let tx = TxLegacy {
            chain_id: Some(self.config.chain_id),
            nonce,
            gas_price: gas_price
                .saturating_mul(u128::from(self.config.gas_price_increasing_coefficient)),
            gas_limit: (estimated_gas as f64 * self.config.gas_limit_increasing_coefficient) as u64,
            to: TxKind::Call(self.bridge_contract),
            value: Default::default(),
            input,
        };

        let signature = self
            .signer
            .sign(
                NetworkType::Evm,
                tx.signature_hash().as_slice(),
                KeyUsage::Transaction,
            )
            .await?;
        let raw = TxEnvelope::from(tx.into_signed(transaction_signature(&signature)?))
            .encoded_2718();
        let hash = self.rpc.send_raw_transaction(&raw).await?;

        info!(
            network = %self.descriptor.network,
            tx_hash = %hash,
            bridge_nonce = req.nonce,
            "submitted bridge out transaction"
        );
        Ok(hash.to_vec())
    }

    async fn estimate_transfer(&self) -> ConnectorResult<Estimation> {
        let gas_price = self.rpc.gas_price().await?;
        let fee = U256::from(gas_price) * U256::from(self.config.gas_limit);

        Ok(Estimation {
            fee: format_units(fee, NATIVE_DECIMALS),
            fee_percentage: self.config.fee_percentage.clone(),
            estimated_confirmation: self.config.confirmation_time,
        })
    }

    async fn bridge_in_signature(
        &self,
        req: BridgeInSignatureRequest,
    ) -> ConnectorResult<BridgeInSignature> {
        if req.amount <= req.gas_commission {
            return Err(ConnectorError::CommissionExceedsAmount);
        }

        let deadline = Utc::now().timestamp().max(0) as u64 + self.config.signature_validity_time;
        let token = decode_address(NetworkType::Evm, &req.token)?;

        let payload = BridgeInPayload {
            user: to_address(&req.user)?,
            token: to_address(&token)?,
            amount: to_word(req.amount),
            gas_commission: to_word(req.gas_commission),
            destination_chain: &req.destination.network_name,
            destination_address: &req.destination.address,
            deadline: to_word(U256::from(deadline)),
            nonce: to_word(req.nonce),
        };
        let signature = sign_packed(self.signer.as_ref(), &payload.encode()).await?;

        Ok(BridgeInSignature {
            token: req.token,
            amount: req.amount,
            gas_commission: req.gas_commission,
            destination: req.destination,
            deadline,
            nonce: req.nonce,
            signature,
        })
    }

    async fn cancel_signature(&self, req: CancelSignatureRequest) -> ConnectorResult<Vec<u8>> {
        let payload = CancelPayload {
            token: to_address(&req.token)?,
            recipient: to_address(&req.recipient)?,
            amount: to_word(req.amount),
            commission: to_word(req.commission),
            nonce: to_word(req.nonce),
        };

        sign_packed(self.signer.as_ref(), &payload.encode()).await
    }
}
