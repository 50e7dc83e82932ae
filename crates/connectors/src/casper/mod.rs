//! Connector of the Casper network.
//!
//! Casper has no log filter, so the connector walks blocks by height. Every deploy of a block is
//! fetched and the effects of its successful executions are searched for writes to the bridge
//! events key. Those writes carry the event blobs decoded by [`blob`].

pub mod blob;
pub mod config;
pub mod deploy;
pub mod rpc;
pub mod signatures;

use std::sync::Arc;

use async_trait::async_trait;
use chain_notify::{Fanout, NotifyOutcome, SubscriberId, Subscription};
use chrono::Utc;
use ethnum::U256;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tricorn_primitives::{
    codec::{canonical_contract, string_to_bytes},
    constants::{
        CASPER_HASH_LENGTH, CASPER_KEY_ACCOUNT_TAG, CASPER_KEY_HASH_TAG, CASPER_TAG_ED25519,
        CASPER_TAG_SECP256K1,
    },
    crypto::{sha256, without_v},
    events::{CrossChainAddress, Event, FundsIn, FundsOut, TransactionInfo},
    networks::{NetworkDescriptor, NetworkType},
};
use tricorn_signer::{BridgeSigner, KeyUsage};

use self::{
    blob::{decode_blob, BlobFields, EventBlob},
    config::CasperConfig,
    deploy::{CLValue, Deploy, ExecutableDeployItem, NamedArg},
    rpc::{CasperBlock, CasperRpc, DeployInfo, ExecutionOutcome},
    signatures::{sign_payload, BridgeInPayload, TransferOutPayload},
};
use crate::{
    errors::{ConnectorError, ConnectorResult},
    traits::{
        BridgeInSignature, BridgeInSignatureRequest, BridgeOutRequest, CancelSignatureRequest,
        Connector, Estimation,
    },
};

/// Entry point of the bridge contract that releases tokens.
pub const BRIDGE_OUT_ENTRY_POINT: &str = "bridge_out";

const ED25519_PUBLIC_KEY_LENGTH: usize = 32;

fn decode_hex(s: &str, what: &str) -> ConnectorResult<Vec<u8>> {
    hex::decode(s).map_err(|e| ConnectorError::MalformedEvent(format!("{what} {s}: {e}")))
}

/// Reads a 32 byte hash, dropping a leading key tag.
fn key_hash(bytes: &[u8], what: &str) -> ConnectorResult<[u8; 32]> {
    let bytes = match bytes.len() {
        len if len == CASPER_HASH_LENGTH + 1 => &bytes[1..],
        _ => bytes,
    };

    bytes.try_into().map_err(|_| {
        ConnectorError::InvalidRequest(format!("{what} is not a 32 byte hash: {}", hex::encode(bytes)))
    })
}

fn tagged(tag: u8, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(tag);
    out.extend_from_slice(bytes);
    out
}

/// Lifts a decoded blob into a chain-neutral event.
fn to_event(blob: EventBlob, tx: TransactionInfo) -> Event {
    let token = tagged(CASPER_KEY_HASH_TAG, &blob.token);
    let user = tagged(CASPER_KEY_ACCOUNT_TAG, &blob.user);
    let other = CrossChainAddress {
        network_name: blob.chain_name,
        address: blob.chain_address,
    };

    match blob.fields {
        BlobFields::FundsIn { amount, .. } => Event::FundsIn(FundsIn {
            from: user,
            to: other,
            amount,
            token,
            tx,
        }),
        BlobFields::FundsOut { amount, .. } => Event::FundsOut(FundsOut {
            from: other,
            to: user,
            amount,
            token,
            tx,
        }),
    }
}

/// The connected Casper network.
#[derive(Debug)]
pub struct CasperConnector<R> {
    config: CasperConfig,
    descriptor: NetworkDescriptor,
    bridge_contract: [u8; 32],
    rpc: R,
    signer: Arc<dyn BridgeSigner>,
    fanout: Fanout<Event>,
}

impl<R: CasperRpc> CasperConnector<R> {
    /// Creates a connector. Fails if the configured contract does not decode.
    pub fn new(
        config: CasperConfig,
        rpc: R,
        signer: Arc<dyn BridgeSigner>,
        fanout: Fanout<Event>,
    ) -> ConnectorResult<Self> {
        if config.chain_name.network_type() != NetworkType::Casper {
            return Err(ConnectorError::InvalidConfig(format!(
                "{} is not a Casper network",
                config.chain_name
            )));
        }

        let bridge_contract = config.bridge_contract()?;
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
            rpc,
            signer,
            fanout,
        })
    }

    /// The node client.
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    async fn deploy_events(
        &self,
        block: &CasperBlock,
        deploy: DeployInfo,
    ) -> ConnectorResult<Vec<Event>> {
        let mut events = Vec::new();
        let hash = decode_hex(&deploy.hash, "deploy hash")?;
        let sender = decode_hex(&deploy.account, "deploy account")?;

        for result in deploy.execution_results {
            let effect = match result.result {
                ExecutionOutcome::Success { effect } => effect,
                ExecutionOutcome::Failure { error_message } => {
                    debug!(deploy = %deploy.hash, %error_message, "skipping failed deploy");
                    continue;
                }
            };

            let block_number = if result.block_hash == block.hash {
                block.height
            } else {
                self.rpc.block_height_by_hash(&result.block_hash).await?
            };

            for transform in effect.transforms {
                if transform.key != self.config.bridge_events_hash {
                    continue;
                }
                let Some(bytes) = transform.written_bytes() else {
                    continue;
                };

                let blob = decode_blob(&decode_hex(bytes, "event blob")?)?;
                events.push(to_event(
                    blob,
                    TransactionInfo {
                        hash: hash.clone(),
                        block_number,
                        sender: sender.clone(),
                    },
                ));
            }
        }

        Ok(events)
    }

    /// Bridge events of the block at `height`, in deploy order.
    pub async fn scan_block(&self, height: u64) -> ConnectorResult<Vec<Event>> {
        let block = self.rpc.block_by_height(height).await?;

        let mut events = Vec::new();
        for deploy_hash in &block.deploy_hashes {
            let deploy = self.rpc.deploy(deploy_hash).await?;
            events.extend(self.deploy_events(&block, deploy).await?);
        }

        Ok(events)
    }

    /// Scans and publishes `[from, to]`. Returns `false` if publishing stopped because of
    /// cancellation.
    async fn publish_blocks(
        &self,
        from: u64,
        to: u64,
        cancel: &CancellationToken,
    ) -> ConnectorResult<bool> {
        for height in from..=to {
            if cancel.is_cancelled() {
                return Ok(false);
            }

            let events = self.scan_block(height).await?;
            if !events.is_empty() {
                debug!(network = %self.descriptor.network, height, events = events.len(), "publishing events");
            }
            for event in events {
                if matches!(self.fanout.notify(event, cancel).await, NotifyOutcome::Cancelled) {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    /// Publishes every event of `[from, to]`.
    pub async fn backfill(
        &self,
        from: u64,
        to: u64,
        cancel: &CancellationToken,
    ) -> ConnectorResult<()> {
        if self.publish_blocks(from, to, cancel).await? {
            info!(network = %self.descriptor.network, from, to, "historical events read");
        }
        Ok(())
    }

    /// Runs one live tail step and returns the new watermark, the last fully published block.
    pub async fn advance(&self, watermark: u64, cancel: &CancellationToken) -> ConnectorResult<u64> {
        let current = self.rpc.latest_block_height().await?;
        if current <= watermark {
            return Ok(watermark);
        }

        if self.publish_blocks(watermark + 1, current, cancel).await? {
            Ok(current)
        } else {
            Ok(watermark)
        }
    }

    async fn tail(&self, cancel: &CancellationToken) -> ConnectorResult<()> {
        let start = self.rpc.latest_block_height().await?;
        let mut watermark = start.saturating_sub(1);

        let mut ticker = interval(self.config.events_reading_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            match self.advance(watermark, cancel).await {
                Ok(next) => watermark = next,
                Err(e) => {
                    warn!(network = %self.descriptor.network, watermark, %e, "could not read real time events");
                }
            }
        }
    }

    /// Tagged public key of the transaction key.
    async fn account(&self) -> ConnectorResult<Vec<u8>> {
        let public_key = self.signer.public_key(NetworkType::Casper).await?;
        let tag = if public_key.len() == ED25519_PUBLIC_KEY_LENGTH {
            CASPER_TAG_ED25519
        } else {
            CASPER_TAG_SECP256K1
        };

        Ok(tagged(tag, &public_key))
    }

    /// Builds the unapproved `bridge_out` deploy for `req`.
    pub fn bridge_out_deploy(
        &self,
        account: Vec<u8>,
        timestamp: u64,
        req: &BridgeOutRequest,
    ) -> ConnectorResult<Deploy> {
        let token = key_hash(
            canonical_contract(self.descriptor.network, &req.token),
            "token",
        )?;
        let recipient = key_hash(&req.to, "recipient")?;

        let session = ExecutableDeployItem::StoredContractByHash {
            hash: self.bridge_contract,
            entry_point: BRIDGE_OUT_ENTRY_POINT.to_string(),
            args: vec![
                NamedArg::new("token_contract", CLValue::ByteArray(token.to_vec())),
                NamedArg::new("amount", CLValue::U256(req.amount)),
                NamedArg::new("transaction_id", CLValue::U256(req.transaction_id)),
                NamedArg::new("source_chain", CLValue::String(req.from.network_name.clone())),
                NamedArg::new("source_address", CLValue::String(req.from.address.clone())),
                NamedArg::new("recipient", CLValue::AccountKey(recipient)),
            ],
        };

        Ok(Deploy::new(
            account,
            timestamp,
            &self.config.deploy_chain_name(),
            ExecutableDeployItem::standard_payment(self.config.gas_limit),
            session,
        ))
    }
}

#[async_trait]
impl<R: CasperRpc> Connector for CasperConnector<R> {
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
        let current = self.rpc.latest_block_height().await?;
        info!(network = %self.descriptor.network, from_block, current, "reading events");

        let backfill = async {
            if from_block == 0 || from_block >= current {
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
        let account = self.account().await?;
        let timestamp = Utc::now().timestamp_millis().max(0) as u64;
        let mut deploy = self.bridge_out_deploy(account.clone(), timestamp, &req)?;

        // secp256k1 approvals are verified over the SHA-256 of the deploy hash.
        let (tag, message) = match account[0] {
            CASPER_TAG_ED25519 => (CASPER_TAG_ED25519, deploy.hash.to_vec()),
            _ => (CASPER_TAG_SECP256K1, sha256(deploy.hash).to_vec()),
        };
        let signature = self
            .signer
            .sign(NetworkType::Casper, &message, KeyUsage::Transaction)
            .await?;
        deploy.approve(account, tagged(tag, without_v(&signature)));

        let hash = self.rpc.put_deploy(&deploy.to_json()?).await?;
        info!(
            network = %self.descriptor.network,
            deploy_hash = %hash,
            bridge_nonce = req.nonce,
            "submitted bridge out deploy"
        );

        decode_hex(&hash, "deploy hash")
    }

    async fn estimate_transfer(&self) -> ConnectorResult<Estimation> {
        Ok(Estimation {
            fee: self.config.gas_limit.to_string(),
            fee_percentage: self.config.fee_percentage.clone(),
            estimated_confirmation: self.config.confirmation_time,
        })
    }

    async fn bridge_in_signature(
        &self,
        req: BridgeInSignatureRequest,
    ) -> ConnectorResult<BridgeInSignature> {
        let token = string_to_bytes(self.descriptor.network, &req.token)?;
        let validity_ms = self.config.signature_validity_time.saturating_mul(1000);
        let deadline = (Utc::now().timestamp_millis().max(0) as u64).saturating_add(validity_ms);

        let payload = BridgeInPayload {
            prefix: &self.config.bridge_in_prefix,
            bridge_hash: &self.bridge_contract,
            token_package_hash: canonical_contract(self.descriptor.network, &token),
            account: &req.user,
            amount: req.amount,
            gas_commission: req.gas_commission,
            deadline: U256::from(deadline),
            nonce: req.nonce,
            destination_chain: &req.destination.network_name,
            destination_address: &req.destination.address,
        };
        let signature = sign_payload(self.signer.as_ref(), &payload.encode()).await?;

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
        // the contract binds the refund to the withdrawing account, the recipient slot stays
        // empty.
        let payload = TransferOutPayload {
            prefix: &self.config.transfer_out_prefix,
            bridge_hash: &self.bridge_contract,
            token_package_hash: canonical_contract(self.descriptor.network, &req.token),
            account: &req.recipient,
            recipient: &[],
            amount: req.amount,
            commission: req.commission,
            nonce: req.nonce,
        };

        sign_payload(self.signer.as_ref(), &payload.encode()).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chain_notify::FanoutConfig;
    use futures::{FutureExt, StreamExt};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tricorn_primitives::{events::EventType, networks::Network};
    use tricorn_signer::{InMemoryKeyStore, SignerService};

    use super::{
        blob::tests::{encode_blob, funds_in_blob},
        rpc::{Effect, ExecutionResult, TransformEntry},
        *,
    };

    const EVENTS_KEY: &str = "uref-bridge-events";
    const BRIDGE: &str = "23e2dafc78abbb9a5159aef578eafd1794774838ddae2cfc8ed5165ee67b471d";
    // seed followed by the public key.
    const ED25519_KEYPAIR: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
    const SECP_KEY: &str = "cc903a2179a5c47acef21d732c0693848c6c33e626fd6651b3773732bde6e127";

    #[derive(Debug, Default)]
    struct MockCasperRpc {
        latest: Mutex<u64>,
        blocks: HashMap<u64, CasperBlock>,
        deploys: HashMap<String, DeployInfo>,
        heights_by_hash: HashMap<String, u64>,
        scanned: Mutex<Vec<u64>>,
        submitted: Mutex<Vec<Value>>,
    }

    impl MockCasperRpc {
        fn with_block(mut self, height: u64, deploys: Vec<DeployInfo>) -> Self {
            let block = CasperBlock {
                hash: format!("block-{height}"),
                height,
                deploy_hashes: deploys.iter().map(|d| d.hash.clone()).collect(),
            };
            self.heights_by_hash.insert(block.hash.clone(), height);
            self.blocks.insert(height, block);
            for deploy in deploys {
                self.deploys.insert(deploy.hash.clone(), deploy);
            }
            *self.latest.get_mut() = height.max(*self.latest.get_mut());
            self
        }
    }

    #[async_trait]
    impl CasperRpc for MockCasperRpc {
        async fn latest_block_height(&self) -> ConnectorResult<u64> {
            Ok(*self.latest.lock())
        }

        async fn block_by_height(&self, height: u64) -> ConnectorResult<CasperBlock> {
            self.scanned.lock().push(height);
            Ok(self.blocks.get(&height).cloned().unwrap_or(CasperBlock {
                hash: format!("block-{height}"),
                height,
                deploy_hashes: Vec::new(),
            }))
        }

        async fn block_height_by_hash(&self, hash: &str) -> ConnectorResult<u64> {
            self.heights_by_hash
                .get(hash)
                .copied()
                .ok_or_else(|| ConnectorError::UnexpectedResponse(format!("unknown block {hash}")))
        }

        async fn deploy(&self, hash: &str) -> ConnectorResult<DeployInfo> {
            self.deploys
                .get(hash)
                .cloned()
                .ok_or_else(|| ConnectorError::UnexpectedResponse(format!("unknown deploy {hash}")))
        }

        async fn put_deploy(&self, deploy: &Value) -> ConnectorResult<String> {
            self.submitted.lock().push(deploy.clone());
            deploy["hash"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ConnectorError::UnexpectedResponse("deploy without hash".to_string()))
        }
    }

    fn write(key: &str, blob: &EventBlob) -> TransformEntry {
        TransformEntry {
            key: key.to_string(),
            transform: json!({ "WriteCLValue": { "cl_type": { "List": "U8" }, "bytes": hex::encode(encode_blob(blob)) } }),
        }
    }

    fn deploy(hash_byte: u8, results: Vec<ExecutionResult>) -> DeployInfo {
        DeployInfo {
            hash: hex::encode([hash_byte; 32]),
            account: format!("01{}", "ab".repeat(32)),
            execution_results: results,
        }
    }

    fn success(block_hash: &str, transforms: Vec<TransformEntry>) -> ExecutionResult {
        ExecutionResult {
            block_hash: block_hash.to_string(),
            result: ExecutionOutcome::Success {
                effect: Effect { transforms },
            },
        }
    }

    fn connector(rpc: MockCasperRpc, key: &str) -> CasperConnector<MockCasperRpc> {
        let store = InMemoryKeyStore::new()
            .with_key(NetworkType::Casper, KeyUsage::Transaction, key)
            .with_key(NetworkType::Casper, KeyUsage::Signature, SECP_KEY);
        let config = CasperConfig::new(
            Network::CasperTest,
            "http://localhost:7777/rpc",
            BRIDGE,
            EVENTS_KEY,
        )
        .with_gas_limit(5_000_000_000)
        .with_estimation("0.4", 120);

        CasperConnector::new(
            config,
            rpc,
            Arc::new(SignerService::new(store)),
            Fanout::new(FanoutConfig::default(), CancellationToken::new()),
        )
        .expect("must build connector")
    }

    #[tokio::test]
    async fn test_scan_block_decodes_bridge_writes() {
        let blob = funds_in_blob(1_000);
        let rpc = MockCasperRpc::default()
            .with_block(7, Vec::new())
            .with_block(
                8,
                vec![
                    deploy(
                        0x01,
                        vec![success(
                            "block-8",
                            vec![write("uref-other", &blob), write(EVENTS_KEY, &blob)],
                        )],
                    ),
                    deploy(
                        0x02,
                        vec![ExecutionResult {
                            block_hash: "block-8".to_string(),
                            result: ExecutionOutcome::Failure {
                                error_message: "User error: 3".to_string(),
                            },
                        }],
                    ),
                    // executed in an earlier block.
                    deploy(0x03, vec![success("block-7", vec![write(EVENTS_KEY, &blob)])]),
                ],
            );
        let connector = connector(rpc, ED25519_KEYPAIR);

        let events = connector.scan_block(8).await.expect("must scan");
        assert_eq!(events.len(), 2, "only bridge writes of successful deploys must be lifted");

        let Event::FundsIn(funds_in) = &events[0] else {
            panic!("must be a funds-in event");
        };
        assert_eq!(funds_in.token, tagged(CASPER_KEY_HASH_TAG, &blob.token));
        assert_eq!(funds_in.from, tagged(CASPER_KEY_ACCOUNT_TAG, &blob.user));
        assert_eq!(funds_in.to.network_name, "GOERLI");
        assert_eq!(funds_in.amount, U256::from(1_000u64));
        assert_eq!(funds_in.tx.hash, vec![0x01; 32]);
        assert_eq!(funds_in.tx.block_number, 8);
        assert_eq!(funds_in.tx.sender[0], CASPER_TAG_ED25519);

        assert_eq!(events[1].event_type(), EventType::In);
        assert_eq!(events[1].block(), 7, "block number must follow the result's block hash");
    }

    #[tokio::test]
    async fn test_advance_scans_new_blocks_once() {
        let blob = funds_in_blob(5);
        let rpc = MockCasperRpc::default().with_block(
            12,
            vec![deploy(0x0c, vec![success("block-12", vec![write(EVENTS_KEY, &blob)])])],
        );
        let connector = connector(rpc, ED25519_KEYPAIR);
        let mut sub = connector.subscribe();
        let cancel = CancellationToken::new();

        let watermark = connector.advance(10, &cancel).await.expect("must advance");
        assert_eq!(watermark, 12);
        assert_eq!(*connector.rpc().scanned.lock(), vec![11, 12]);

        let event = sub.next().await.expect("must receive the event");
        assert_eq!(event.block(), 12);

        let watermark = connector.advance(12, &cancel).await.expect("must advance");
        assert_eq!(watermark, 12, "an idle chain must keep the watermark");
        assert_eq!(connector.rpc().scanned.lock().len(), 2);
        assert!(sub.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn test_bridge_out_submits_approved_deploy() {
        let connector = connector(MockCasperRpc::default(), ED25519_KEYPAIR);
        let req = BridgeOutRequest {
            amount: U256::from(969_999_999_000u64),
            token: tagged(CASPER_KEY_HASH_TAG, &[0xc6; 32]),
            to: tagged(CASPER_KEY_ACCOUNT_TAG, &[0x5e; 32]),
            from: CrossChainAddress {
                network_name: "GOERLI".to_string(),
                address: "0x7e0f5a592322bc973dde62df3f91604d21d37446".to_string(),
            },
            transaction_id: U256::from(9u64),
            nonce: 3,
        };

        let hash = connector.bridge_out(req).await.expect("must submit");
        assert_eq!(hash.len(), 32);

        let submitted = connector.rpc().submitted.lock()[0].clone();
        assert_eq!(submitted["hash"], hex::encode(&hash));
        assert_eq!(submitted["header"]["chain_name"], "casper-test");
        let session = &submitted["session"]["StoredContractByHash"];
        assert_eq!(session["hash"], BRIDGE);
        assert_eq!(session["entry_point"], BRIDGE_OUT_ENTRY_POINT);
        assert_eq!(session["args"][0][1]["bytes"], hex::encode([0xc6; 32]));
        assert_eq!(
            session["args"][5][1]["bytes"],
            format!("00{}", hex::encode([0x5e; 32]))
        );

        let approval = &submitted["approvals"][0];
        let signer = approval["signer"].as_str().expect("must be a string");
        let signature = approval["signature"].as_str().expect("must be a string");
        assert!(signer.starts_with("01") && signer.len() == 66);
        assert!(signature.starts_with("01") && signature.len() == 130);
        assert_eq!(submitted["header"]["account"], signer);
    }

    #[tokio::test]
    async fn test_bridge_out_rejects_unrepresentable_recipient() {
        let connector = connector(MockCasperRpc::default(), ED25519_KEYPAIR);
        let req = BridgeOutRequest {
            amount: U256::ONE,
            token: vec![0xc6; 32],
            to: vec![0x5e; 20],
            from: CrossChainAddress {
                network_name: "GOERLI".to_string(),
                address: "0x00".to_string(),
            },
            transaction_id: U256::ZERO,
            nonce: 1,
        };

        assert!(matches!(
            connector.bridge_out(req).await,
            Err(ConnectorError::InvalidRequest(_))
        ));
        assert!(connector.rpc().submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_estimate_and_signatures() {
        let connector = connector(MockCasperRpc::default(), SECP_KEY);

        let estimation = connector.estimate_transfer().await.expect("must estimate");
        assert_eq!(estimation.fee, "5000000000");
        assert_eq!(estimation.estimated_confirmation, 120);

        let response = connector
            .bridge_in_signature(BridgeInSignatureRequest {
                user: vec![0x5e; 32],
                nonce: U256::from(555u64),
                token: format!("hash-{}", "c6".repeat(32)),
                amount: U256::from(1_000u64),
                gas_commission: U256::from(10u64),
                destination: CrossChainAddress {
                    network_name: "GOERLI".to_string(),
                    address: "0x7e0f5a592322bc973dde62df3f91604d21d37446".to_string(),
                },
            })
            .await
            .expect("must sign");
        assert_eq!(response.signature.len(), 64, "recovery id must be stripped");
        assert!(
            response.deadline > Utc::now().timestamp_millis() as u64,
            "deadline must be a future time in milliseconds"
        );

        let cancel = connector
            .cancel_signature(CancelSignatureRequest {
                nonce: U256::from(556u64),
                token: vec![0xc6; 32],
                recipient: vec![0x5e; 32],
                commission: U256::from(10u64),
                amount: U256::from(990u64),
            })
            .await
            .expect("must sign");
        assert_eq!(cancel.len(), 64);
    }
}
