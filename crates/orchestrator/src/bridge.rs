//! The bridge service.
//!
//! [`Bridge`] owns the connector registry and the chores reading from every connected chain, and
//! answers the queries and signature requests of clients.

use std::sync::Arc;

use ethnum::U256;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tricorn_connectors::{
    BridgeInSignature, BridgeInSignatureRequest, CancelSignatureRequest, Connector, Estimation,
};
use tricorn_db::{
    transfers::{TokenTransfer, Transaction},
    BridgeDb,
};
use tricorn_primitives::{
    codec::{bytes_to_string, string_to_bytes},
    crypto::verify_auth_signature,
    events::CrossChainAddress,
    networks::{Network, NetworkDescriptor, NetworkType},
    transfer::TransferStatus,
};
use tricorn_signer::{BridgeSigner, KeyUsage};

use crate::{
    chore::Chore,
    errors::{BridgeError, BridgeResult},
    handlers::{self, EventHandler},
    registry::ConnectorRegistry,
    types::{
        BridgeInRequest, CancelRequest, CancelledTransfer, EstimateRequest, HistoryPage,
        HistoryRequest, SupportedToken, TokenContract, TransferView, TxReference,
    },
};

/// The cross-chain bridge.
#[derive(Debug)]
pub struct Bridge<D> {
    db: Arc<D>,
    signer: Arc<dyn BridgeSigner>,
    registry: ConnectorRegistry,
    handler: Arc<EventHandler<D>>,
    shutdown: CancellationToken,
}

impl<D: BridgeDb + 'static> Bridge<D> {
    /// Creates the bridge and spawns its connector registry.
    ///
    /// Every chore started by the bridge stops once `shutdown` fires.
    pub fn new(
        db: Arc<D>,
        signer: Arc<dyn BridgeSigner>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (registry, handle) = ConnectorRegistry::spawn(shutdown.clone());
        let handler = Arc::new(EventHandler::new(db.clone(), registry.clone()));

        let bridge = Self {
            db,
            signer,
            registry,
            handler,
            shutdown,
        };

        (bridge, handle)
    }

    /// Registers a connector and starts reading its events.
    pub async fn add_connector(&self, connector: Arc<dyn Connector>) -> BridgeResult<()> {
        let network = connector.network().network;
        handlers::bridge_contract(connector.network())?;

        let cancel = self.shutdown.child_token();
        let generation = self.registry.add(connector.clone(), cancel.clone()).await?;

        let chore = Chore {
            db: self.db.clone(),
            handler: self.handler.clone(),
            registry: self.registry.clone(),
            connector,
            generation,
        };
        tokio::spawn(async move {
            // failures are logged by the chore, which also drops the connector.
            let _ = chore.run(cancel).await;
        });

        info!(%network, "connector added");
        Ok(())
    }

    /// Stops reading from `network` and forgets its connector.
    pub async fn remove_connector(&self, network: Network) -> BridgeResult<bool> {
        self.registry.remove(network).await
    }

    /// Whether a connector for `network` is registered.
    pub async fn is_connector_connected(&self, network: Network) -> BridgeResult<bool> {
        Ok(self.registry.lookup(network).await?.is_some())
    }

    /// Descriptors of the connected networks, ordered by network id.
    pub async fn list_connected_networks(&self) -> BridgeResult<Vec<NetworkDescriptor>> {
        Ok(self
            .registry
            .list()
            .await?
            .iter()
            .map(|connector| connector.network().clone())
            .collect())
    }

    /// Tokens known on a connected network, each with its contract on every network.
    pub async fn list_supported_tokens(&self, network_id: u32) -> BridgeResult<Vec<SupportedToken>> {
        let network = Network::from_id(network_id)?;
        self.connected(network).await?;

        let tokens = self.db.tokens_on_network(network.id()).await?;
        let mut supported = Vec::with_capacity(tokens.len());
        for token in tokens {
            let contracts = self
                .db
                .network_tokens(token.id)
                .await?
                .into_iter()
                .map(|contract| {
                    let network = Network::from_id(contract.network_id)?;
                    Ok(TokenContract {
                        network_id: contract.network_id,
                        address: bytes_to_string(network, &contract.contract_address),
                        decimals: contract.decimals,
                    })
                })
                .collect::<BridgeResult<Vec<_>>>()?;

            supported.push(SupportedToken {
                id: token.id,
                short_name: token.short_name,
                long_name: token.long_name,
                contracts,
            });
        }

        Ok(supported)
    }

    /// The transfer triggered by `tx_hash` on the named network.
    pub async fn transfers_info(
        &self,
        network_name: &str,
        tx_hash: &str,
    ) -> BridgeResult<TransferView> {
        let network = Network::from_name(network_name)?;
        self.connected(network).await?;

        let hash = string_to_bytes(network, tx_hash)?;
        let transfer = self
            .db
            .transfer_by_triggering_tx(network.id(), &hash)
            .await?
            .ok_or_else(|| BridgeError::NoTransfer(tx_hash.to_owned()))?;

        self.render(&transfer).await
    }

    /// A page of the transfers of the user who signed the authentication proof.
    pub async fn history(&self, req: &HistoryRequest) -> BridgeResult<HistoryPage> {
        let network = Network::from_id(req.network_id)?;
        self.connected(network).await?;

        let user = verify_auth_signature(
            network.network_type(),
            &req.signature,
            req.public_key.as_deref(),
        )?;
        debug!(%network, user = %bytes_to_string(network, &user), "history requested");

        let page = self
            .db
            .transfers_by_sender(network.id(), &user, req.offset, req.limit)
            .await?;
        let mut transfers = Vec::with_capacity(page.len());
        for transfer in &page {
            transfers.push(self.render(transfer).await?);
        }

        let total_count = self
            .db
            .count_transfers_by_sender(network.id(), &user)
            .await?;

        Ok(HistoryPage {
            transfers,
            offset: req.offset,
            limit: req.limit,
            total_count,
        })
    }

    /// Estimates a transfer between two connected networks.
    pub async fn estimate_transfer(&self, req: &EstimateRequest) -> BridgeResult<Estimation> {
        let sender = Network::from_name(&req.sender_network)?;
        self.connected(sender).await?;
        let recipient = Network::from_name(&req.recipient_network)?;
        let connector = self.connected(recipient).await?;
        parse_amount(&req.amount)?;

        Ok(connector.estimate_transfer().await?)
    }

    /// Signs the BridgeIn payload a user presents to lock funds on the sender network.
    pub async fn bridge_in_signature(
        &self,
        req: &BridgeInRequest,
    ) -> BridgeResult<BridgeInSignature> {
        let sender = Network::from_name(&req.sender.network_name)?;
        let connector = self.connected(sender).await?;
        let amount = parse_amount(&req.amount)?;

        let token = self
            .db
            .network_token(sender.id(), req.token_id)
            .await?
            .ok_or_else(|| BridgeError::NoNetworkToken {
                network: sender,
                token: req.token_id.to_string(),
            })?;
        let user = string_to_bytes(sender, &req.sender.address)?;

        let nonce = self.db.next_nonce(sender.id()).await?;
        let signature = connector
            .bridge_in_signature(BridgeInSignatureRequest {
                user,
                nonce: U256::from(nonce),
                token: bytes_to_string(sender, &token.contract_address),
                amount,
                gas_commission: U256::ZERO,
                destination: req.destination.clone(),
            })
            .await?;

        info!(%sender, nonce, destination = %req.destination.network_name, "bridge in signature issued");
        Ok(signature)
    }

    /// Cancels a transfer that is still WAITING and signs the refund.
    pub async fn cancel_transfer(&self, req: &CancelRequest) -> BridgeResult<CancelledTransfer> {
        let network = Network::from_id(req.network_id)?;
        let connector = self.connected(network).await?;

        let tx_hash = string_to_bytes(network, &req.tx_hash)?;
        let transfer = self
            .db
            .transfer_by_triggering_tx(network.id(), &tx_hash)
            .await?
            .ok_or_else(|| BridgeError::NoTransfer(req.tx_hash.clone()))?;
        if transfer.status != TransferStatus::Waiting {
            return Err(BridgeError::InvalidTransferStatus {
                id: transfer.id,
                status: transfer.status,
            });
        }

        let token = self
            .db
            .network_token(network.id(), transfer.token_id)
            .await?
            .ok_or_else(|| BridgeError::NoNetworkToken {
                network,
                token: transfer.token_id.to_string(),
            })?;
        let recipient = string_to_bytes(network, &req.recipient)?;

        let estimation = connector.estimate_transfer().await?;
        let commission = parse_amount(&estimation.fee)?;

        let nonce = self.db.next_nonce(network.id()).await?;
        let signature = connector
            .cancel_signature(CancelSignatureRequest {
                nonce: U256::from(nonce),
                token: token.contract_address.clone(),
                recipient,
                commission,
                amount: transfer.amount,
            })
            .await?;

        let cancelled = self
            .db
            .update_transfer_status(
                transfer.id,
                TransferStatus::Waiting,
                TransferStatus::Cancelled,
            )
            .await?;
        if !cancelled {
            // the outbound side won the race.
            let status = self
                .db
                .transfer(transfer.id)
                .await?
                .map_or(transfer.status, |t| t.status);
            return Err(BridgeError::InvalidTransferStatus {
                id: transfer.id,
                status,
            });
        }

        info!(%network, transfer = transfer.id, nonce, "transfer cancelled");
        Ok(CancelledTransfer {
            status: TransferStatus::Cancelled,
            nonce,
            signature,
            token: token.contract_address,
            recipient: transfer.sender_address,
            commission,
            amount: transfer.amount,
        })
    }

    /// Signs `data` with the bridge key of `network_type`.
    pub async fn sign(
        &self,
        network_type: NetworkType,
        data: &[u8],
        usage: KeyUsage,
    ) -> BridgeResult<Vec<u8>> {
        Ok(self.signer.sign(network_type, data, usage).await?)
    }

    /// Public key of the bridge on `network_type`.
    pub async fn public_key(&self, network_type: NetworkType) -> BridgeResult<Vec<u8>> {
        Ok(self.signer.public_key(network_type).await?)
    }

    async fn connected(&self, network: Network) -> BridgeResult<Arc<dyn Connector>> {
        self.registry
            .lookup(network)
            .await?
            .ok_or(BridgeError::NotConnectedNetwork(network))
    }

    async fn render(&self, transfer: &TokenTransfer) -> BridgeResult<TransferView> {
        let sender_network = Network::from_id(transfer.sender_network_id)?;
        let recipient_network = Network::from_id(transfer.recipient_network_id)?;

        let triggering = self.recorded_transaction(transfer.triggering_tx).await?;
        let outbound_tx = match transfer.outbound_tx {
            Some(id) => Some(tx_reference(&self.recorded_transaction(id).await?)?),
            None => None,
        };

        Ok(TransferView {
            id: transfer.id,
            amount: transfer.amount,
            sender: CrossChainAddress {
                network_name: sender_network.name().to_owned(),
                address: bytes_to_string(sender_network, &transfer.sender_address),
            },
            recipient: CrossChainAddress {
                network_name: recipient_network.name().to_owned(),
                address: bytes_to_string(recipient_network, &transfer.recipient_address),
            },
            status: transfer.status,
            triggering_tx: tx_reference(&triggering)?,
            outbound_tx,
            created_at: triggering.seen_at,
        })
    }

    async fn recorded_transaction(&self, id: i64) -> BridgeResult<Transaction> {
        self.db
            .transaction(id)
            .await?
            .ok_or(BridgeError::NoTransaction(id))
    }
}

fn tx_reference(tx: &Transaction) -> BridgeResult<TxReference> {
    let network = Network::from_id(tx.network_id)?;

    Ok(TxReference {
        network_name: network.name().to_owned(),
        hash: bytes_to_string(network, &tx.tx_hash),
    })
}

/// Parses a non-negative decimal amount.
fn parse_amount(amount: &str) -> BridgeResult<U256> {
    U256::from_str_radix(amount, 10).map_err(|_| BridgeError::InvalidAmount(amount.to_owned()))
}

#[cfg(test)]
mod tests {
    use tricorn_db::{
        networks::NetworkBlockDb, persistent::sqlite::SqliteDb, transfers::TokenTransferDb,
    };
    use tricorn_primitives::crypto::to_evm_signature;
    use tricorn_signer::{InMemoryKeyStore, SignerError, SignerService};

    use super::*;
    use crate::testing::{
        deposit_event, deposit_from, seed_usdt, test_db, wait_for, MockConnector,
        DEPOSIT_AMOUNT, DEPOSIT_SENDER, DEPOSIT_TX, GOERLI_USDT, MOCK_FEE, SOLANA_RECIPIENT,
    };

    const AUTH_SIGNATURE: &str = "d29bb47954dc2c0d67778507d9a96852bd0da75dce2337009fcce23a6dedb5625ad5541523ac3c2959c0d31b60b62b980a3c778fd903cedf9f17a99ba9d2152e1b";
    const AUTH_ADDRESS: &str = "3095f955da700b96215cffc9bc64ab2e69eb7dab";
    const EVM_KEY: &str = "cc903a2179a5c47acef21d732c0693848c6c33e626fd6651b3773732bde6e127";

    async fn bridge() -> (Bridge<SqliteDb>, Arc<SqliteDb>) {
        let db = test_db().await;
        seed_usdt(&db).await;

        let signer = SignerService::new(InMemoryKeyStore::new().with_key(
            NetworkType::Evm,
            KeyUsage::Signature,
            EVM_KEY,
        ));
        let (bridge, _handle) = Bridge::new(db.clone(), Arc::new(signer), CancellationToken::new());

        (bridge, db)
    }

    async fn wait_for_transfer(db: &Arc<SqliteDb>, status: TransferStatus) {
        wait_for(|| {
            let db = db.clone();
            async move {
                db.transfer_by_triggering_tx(Network::Goerli.id(), &DEPOSIT_TX)
                    .await
                    .expect("must query")
                    .is_some_and(|t| t.status == status)
            }
        })
        .await;
    }

    #[tokio::test]
    async fn test_connector_lifecycle() {
        let (bridge, _db) = bridge().await;

        for network in [Network::Goerli, Network::CasperTest] {
            bridge
                .add_connector(Arc::new(MockConnector::new(network)))
                .await
                .expect("must add connector");
        }

        let networks = bridge
            .list_connected_networks()
            .await
            .expect("must list")
            .into_iter()
            .map(|d| d.network)
            .collect::<Vec<_>>();
        assert_eq!(networks, vec![Network::CasperTest, Network::Goerli]);

        assert!(bridge
            .is_connector_connected(Network::Goerli)
            .await
            .expect("must answer"));
        assert!(bridge
            .remove_connector(Network::Goerli)
            .await
            .expect("must answer"));
        assert!(!bridge
            .is_connector_connected(Network::Goerli)
            .await
            .expect("must answer"));
    }

    #[tokio::test]
    async fn test_connector_with_undecodable_bridge_contract_is_rejected() {
        let (bridge, _db) = bridge().await;
        let connector = MockConnector::new(Network::Goerli).with_bridge_contract("not hex");

        let err = bridge
            .add_connector(Arc::new(connector))
            .await
            .expect_err("must reject connector");
        assert!(matches!(
            err,
            BridgeError::InvalidBridgeContract {
                network: Network::Goerli,
                ..
            }
        ));
        assert!(!bridge
            .is_connector_connected(Network::Goerli)
            .await
            .expect("must answer"));
    }

    #[tokio::test]
    async fn test_supported_tokens() {
        let (bridge, _db) = bridge().await;

        let err = bridge
            .list_supported_tokens(Network::Goerli.id())
            .await
            .expect_err("disconnected network must be rejected");
        assert!(matches!(err, BridgeError::NotConnectedNetwork(Network::Goerli)));

        bridge
            .add_connector(Arc::new(MockConnector::new(Network::Goerli)))
            .await
            .expect("must add connector");

        let tokens = bridge
            .list_supported_tokens(Network::Goerli.id())
            .await
            .expect("must list");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].short_name, "USDT");
        assert_eq!(tokens[0].contracts.len(), 3, "every network contract must be listed");
        assert!(tokens[0].contracts.contains(&TokenContract {
            network_id: Network::Goerli.id(),
            address: hex::encode(GOERLI_USDT),
            decimals: 18,
        }));
    }

    #[tokio::test]
    async fn test_happy_deposit_is_reported() {
        let (bridge, db) = bridge().await;

        bridge
            .add_connector(Arc::new(MockConnector::new(Network::Solana)))
            .await
            .expect("must add connector");
        let goerli =
            Arc::new(MockConnector::new(Network::Goerli).with_backlog(vec![deposit_event(1234)]));
        bridge
            .add_connector(goerli.clone())
            .await
            .expect("must add connector");

        wait_for_transfer(&db, TransferStatus::Confirming).await;

        let view = bridge
            .transfers_info("GOERLI", &format!("0x{}", hex::encode(DEPOSIT_TX)))
            .await
            .expect("must find transfer");
        assert_eq!(view.amount, DEPOSIT_AMOUNT);
        assert_eq!(view.status, TransferStatus::Confirming);
        assert_eq!(view.sender.address, hex::encode(DEPOSIT_SENDER));
        assert_eq!(view.recipient.network_name, "SOLANA");
        assert_eq!(view.recipient.address, SOLANA_RECIPIENT);
        assert_eq!(view.triggering_tx.hash, hex::encode(DEPOSIT_TX));
        assert_eq!(
            view.outbound_tx.map(|tx| tx.network_name),
            Some("SOLANA".to_owned()),
            "outbound must be reported on the destination"
        );

        // a replayed log leaves everything as is.
        goerli.emit(deposit_event(1234)).await;
        goerli.emit(deposit_event(1235)).await;
        wait_for(|| {
            let db = db.clone();
            async move {
                db.last_seen_block(Network::Goerli.id())
                    .await
                    .expect("must query")
                    == Some(1235)
            }
        })
        .await;
        assert_eq!(
            db.count_transfers_by_sender(Network::Goerli.id(), &DEPOSIT_SENDER)
                .await
                .expect("must count"),
            1,
            "replay must not create a second transfer"
        );
    }

    #[tokio::test]
    async fn test_history_is_authenticated() {
        let (bridge, db) = bridge().await;

        let user: [u8; 20] = hex::decode(AUTH_ADDRESS)
            .expect("must decode")
            .try_into()
            .expect("must be an address");
        let goerli = MockConnector::new(Network::Goerli).with_backlog(vec![
            deposit_from(user, [0x01; 32], 10),
            deposit_from(user, [0x02; 32], 11),
            deposit_from(DEPOSIT_SENDER, [0x03; 32], 12),
        ]);
        bridge
            .add_connector(Arc::new(goerli))
            .await
            .expect("must add connector");

        wait_for(|| {
            let db = db.clone();
            async move {
                db.count_transfers_by_sender(Network::Goerli.id(), &user)
                    .await
                    .expect("must count")
                    == 2
            }
        })
        .await;

        let request = HistoryRequest {
            offset: 1,
            limit: 10,
            signature: hex::decode(AUTH_SIGNATURE).expect("must decode"),
            public_key: None,
            network_id: Network::Goerli.id(),
        };
        let page = bridge.history(&request).await.expect("must page");
        assert_eq!(page.total_count, 2);
        assert_eq!(page.offset, 1);
        assert_eq!(page.transfers.len(), 1, "offset must skip the newest transfer");
        assert_eq!(page.transfers[0].sender.address, AUTH_ADDRESS);
        assert_eq!(page.transfers[0].status, TransferStatus::Waiting);

        let mut forged = request.clone();
        forged.signature[10] ^= 0xff;
        let page = bridge.history(&forged).await;
        assert!(
            !page.is_ok_and(|page| page.total_count == 2),
            "a forged signature must not reveal the user's transfers"
        );
    }

    #[tokio::test]
    async fn test_estimate_transfer_validates_inputs() {
        let (bridge, _db) = bridge().await;
        for network in [Network::Goerli, Network::Solana] {
            bridge
                .add_connector(Arc::new(MockConnector::new(network)))
                .await
                .expect("must add connector");
        }

        let mut request = EstimateRequest {
            sender_network: "GOERLI".to_owned(),
            recipient_network: "SOLANA".to_owned(),
            token_id: 1,
            amount: "1000000".to_owned(),
        };
        let estimation = bridge
            .estimate_transfer(&request)
            .await
            .expect("must estimate");
        assert_eq!(estimation.fee, MOCK_FEE.to_string());

        request.amount = "-5".to_owned();
        assert!(matches!(
            bridge.estimate_transfer(&request).await,
            Err(BridgeError::InvalidAmount(_))
        ));

        request.amount = "5".to_owned();
        request.recipient_network = "CASPER-TEST".to_owned();
        assert!(matches!(
            bridge.estimate_transfer(&request).await,
            Err(BridgeError::NotConnectedNetwork(Network::CasperTest))
        ));

        request.recipient_network = "TRON".to_owned();
        assert!(matches!(
            bridge.estimate_transfer(&request).await,
            Err(BridgeError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_bridge_in_signatures_get_distinct_nonces() {
        let (bridge, _db) = bridge().await;
        bridge
            .add_connector(Arc::new(MockConnector::new(Network::Goerli)))
            .await
            .expect("must add connector");

        let request = BridgeInRequest {
            sender: CrossChainAddress {
                network_name: "GOERLI".to_owned(),
                address: format!("0x{}", hex::encode(DEPOSIT_SENDER)),
            },
            token_id: 1,
            amount: "1000".to_owned(),
            destination: CrossChainAddress {
                network_name: "SOLANA".to_owned(),
                address: SOLANA_RECIPIENT.to_owned(),
            },
        };

        let (first, second) = tokio::join!(
            bridge.bridge_in_signature(&request),
            bridge.bridge_in_signature(&request)
        );
        let first = first.expect("must sign");
        let second = second.expect("must sign");

        let mut nonces = vec![first.nonce, second.nonce];
        nonces.sort();
        assert_eq!(
            nonces,
            vec![U256::ONE, U256::from(2u64)],
            "nonces must be distinct and consecutive"
        );
        assert_eq!(first.token, hex::encode(GOERLI_USDT));
        assert_eq!(first.gas_commission, U256::ZERO);
    }

    #[tokio::test]
    async fn test_cancel_waiting_transfer() {
        let (bridge, db) = bridge().await;

        // the destination is not connected, so the deposit stays WAITING.
        let goerli =
            Arc::new(MockConnector::new(Network::Goerli).with_backlog(vec![deposit_event(5)]));
        bridge
            .add_connector(goerli.clone())
            .await
            .expect("must add connector");
        wait_for_transfer(&db, TransferStatus::Waiting).await;

        let request = CancelRequest {
            network_id: Network::Goerli.id(),
            tx_hash: hex::encode(DEPOSIT_TX),
            recipient: format!("0x{}", hex::encode(DEPOSIT_SENDER)),
        };
        let cancelled = bridge
            .cancel_transfer(&request)
            .await
            .expect("must cancel");
        assert_eq!(cancelled.status, TransferStatus::Cancelled);
        assert_eq!(cancelled.nonce, 1);
        assert_eq!(cancelled.commission, U256::from(MOCK_FEE));
        assert_eq!(cancelled.amount, DEPOSIT_AMOUNT);
        assert_eq!(cancelled.token, GOERLI_USDT.to_vec());
        assert_eq!(cancelled.recipient, DEPOSIT_SENDER.to_vec());

        let signed = goerli.cancel_requests();
        assert_eq!(signed.len(), 1);
        assert_eq!(signed[0].recipient, DEPOSIT_SENDER.to_vec());

        let err = bridge
            .cancel_transfer(&request)
            .await
            .expect_err("second cancellation must be rejected");
        assert!(matches!(
            err,
            BridgeError::InvalidTransferStatus {
                status: TransferStatus::Cancelled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_sign_forwards_to_signer() {
        let (bridge, _db) = bridge().await;

        let signature = bridge
            .sign(NetworkType::Evm, &[0x11; 32], KeyUsage::Signature)
            .await
            .expect("must sign");
        assert_eq!(signature.len(), 65);
        assert!(to_evm_signature(&signature).is_ok(), "recovery id must be 0 or 1");

        let err = bridge
            .sign(NetworkType::Evm, &[0x11; 32], KeyUsage::Transaction)
            .await
            .expect_err("missing key must be reported");
        assert!(matches!(
            err,
            BridgeError::Signer(SignerError::NoPrivateKey { .. })
        ));
    }
}
