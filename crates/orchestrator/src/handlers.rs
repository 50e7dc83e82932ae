//! Reactions to the bridge contract events of a connected chain.

use std::sync::Arc;

use chrono::Utc;
use ethnum::U256;
use tracing::{debug, info, warn};
use tricorn_connectors::BridgeOutRequest;
use tricorn_db::{
    networks::NetworkToken,
    transfers::{NewDeposit, NewTransaction, TokenTransfer, TransferMatch},
    BridgeDb,
};
use tricorn_primitives::{
    codec::{bytes_to_string, canonical_contract, string_to_bytes},
    events::{CrossChainAddress, Event, FundsIn, FundsOut, TransactionInfo},
    networks::{Network, NetworkDescriptor},
    transfer::TransferStatus,
};

use crate::{
    errors::{BridgeError, BridgeResult},
    registry::ConnectorRegistry,
};

/// Applies chain events to the store and triggers the outbound side of transfers.
///
/// Every reaction is idempotent on `(network, tx_hash)`, so events may be delivered more than
/// once.
#[derive(Debug)]
pub struct EventHandler<D> {
    db: Arc<D>,
    registry: ConnectorRegistry,
}

impl<D: BridgeDb> EventHandler<D> {
    /// Creates a handler over the store and the connector registry.
    pub const fn new(db: Arc<D>, registry: ConnectorRegistry) -> Self {
        Self { db, registry }
    }

    /// Reacts to an event observed on `network`.
    pub async fn handle(&self, network: Network, event: &Event) -> BridgeResult<()> {
        match event {
            Event::FundsIn(funds_in) => self.on_funds_in(network, funds_in).await,
            Event::FundsOut(funds_out) => self.on_funds_out(network, funds_out).await,
        }
    }

    async fn on_funds_in(&self, source: Network, event: &FundsIn) -> BridgeResult<()> {
        let recipient_network = Network::from_name(&event.to.network_name)?;
        let recipient_address = string_to_bytes(recipient_network, &event.to.address)?;

        let contract = canonical_contract(source, &event.token);
        let source_token = self
            .db
            .network_token_by_contract(source.id(), contract)
            .await?
            .ok_or_else(|| BridgeError::NoNetworkToken {
                network: source,
                token: bytes_to_string(source, contract),
            })?;
        let recipient_token = self
            .db
            .network_token(recipient_network.id(), source_token.token_id)
            .await?
            .ok_or_else(|| BridgeError::NoNetworkToken {
                network: recipient_network,
                token: source_token.token_id.to_string(),
            })?;

        let tx = new_transaction(source, &event.tx);
        let deposit = NewDeposit {
            token_id: source_token.token_id,
            amount: event.amount,
            sender_network_id: source.id(),
            sender_address: event.from.clone(),
            recipient_network_id: recipient_network.id(),
            recipient_address,
        };

        let tx_hash = bytes_to_string(source, &event.tx.hash);
        let transfer = match self.db.record_deposit(&tx, &deposit).await? {
            Some(transfer) => {
                info!(%source, %tx_hash, transfer = transfer.id, "deposit recorded");
                transfer
            }
            None => match self
                .db
                .transfer_by_triggering_tx(source.id(), &event.tx.hash)
                .await?
            {
                // an earlier submission failed, the replay is the retry.
                Some(transfer) if transfer.status == TransferStatus::Waiting => {
                    debug!(%source, %tx_hash, transfer = transfer.id, "retrying outbound of replayed deposit");
                    transfer
                }
                _ => {
                    debug!(%source, %tx_hash, "deposit already processed");
                    return Ok(());
                }
            },
        };

        self.submit_outbound(source, recipient_network, &recipient_token, &transfer)
            .await
    }

    async fn submit_outbound(
        &self,
        source: Network,
        destination: Network,
        token: &NetworkToken,
        transfer: &TokenTransfer,
    ) -> BridgeResult<()> {
        let connector = self
            .registry
            .lookup(destination)
            .await?
            .ok_or(BridgeError::NotConnectedNetwork(destination))?;
        // nothing is submitted that could not be recorded afterwards.
        let bridge_contract = bridge_contract(connector.network())?;

        let nonce = self.db.next_nonce(destination.id()).await?;
        let request = BridgeOutRequest {
            amount: transfer.amount,
            token: token.contract_address.clone(),
            to: transfer.recipient_address.clone(),
            from: CrossChainAddress {
                network_name: source.name().to_owned(),
                address: bytes_to_string(source, &transfer.sender_address),
            },
            transaction_id: U256::from(transfer.triggering_tx.unsigned_abs()),
            nonce,
        };

        let hash = connector.bridge_out(request).await?;

        let outbound = NewTransaction {
            network_id: destination.id(),
            tx_hash: hash,
            sender: bridge_contract,
            // not mined yet.
            block_number: 0,
            seen_at: Utc::now(),
        };
        let outbound_hash = bytes_to_string(destination, &outbound.tx_hash);

        if self.db.confirm_transfer(transfer.id, &outbound).await? {
            info!(%destination, %outbound_hash, nonce, transfer = transfer.id, "outbound submitted");
        } else {
            warn!(%destination, %outbound_hash, transfer = transfer.id, "transfer left WAITING before its outbound was recorded");
        }

        Ok(())
    }

    async fn on_funds_out(&self, network: Network, event: &FundsOut) -> BridgeResult<()> {
        let tx = new_transaction(network, &event.tx);
        let tx_hash = bytes_to_string(network, &event.tx.hash);

        let tx_id = match self.db.insert_transaction(&tx).await? {
            Some(id) => id,
            None => {
                self.db
                    .transaction_by_hash(network.id(), &event.tx.hash)
                    .await?
                    .ok_or_else(|| BridgeError::NoTransfer(tx_hash.clone()))?
                    .id
            }
        };

        // our own submissions are bound to their transfer already.
        if let Some(transfer) = self.db.transfer_by_outbound_tx(tx_id).await? {
            return self.finish(network, &transfer, tx_id).await;
        }

        let sender_network = Network::from_name(&event.from.network_name)?;
        let release = TransferMatch {
            amount: event.amount,
            sender_network_id: sender_network.id(),
            sender_address: string_to_bytes(sender_network, &event.from.address)?,
            recipient_network_id: network.id(),
            recipient_address: event.to.clone(),
        };

        match self.db.latest_confirming_transfer(&release).await? {
            Some(transfer) => self.finish(network, &transfer, tx_id).await,
            None => {
                info!(%network, %tx_hash, "no transfer matches the release, skipping");
                Ok(())
            }
        }
    }

    async fn finish(
        &self,
        network: Network,
        transfer: &TokenTransfer,
        tx_id: i64,
    ) -> BridgeResult<()> {
        if transfer.status == TransferStatus::Finished {
            debug!(%network, transfer = transfer.id, "release already processed");
            return Ok(());
        }

        if self.db.finish_transfer(transfer.id, tx_id).await? {
            info!(%network, transfer = transfer.id, "transfer finished");
        } else {
            warn!(%network, transfer = transfer.id, status = %transfer.status, "release observed for a transfer that is not CONFIRMING");
        }

        Ok(())
    }
}

fn new_transaction(network: Network, info: &TransactionInfo) -> NewTransaction {
    NewTransaction {
        network_id: network.id(),
        tx_hash: info.hash.clone(),
        sender: info.sender.clone(),
        block_number: info.block_number,
        seen_at: Utc::now(),
    }
}

/// Decodes the bridge contract of a connected network, the sender of its outbound transactions.
pub(crate) fn bridge_contract(descriptor: &NetworkDescriptor) -> BridgeResult<Vec<u8>> {
    string_to_bytes(descriptor.network, &descriptor.bridge_contract).map_err(|source| {
        BridgeError::InvalidBridgeContract {
            network: descriptor.network,
            source,
        }
    })
}
