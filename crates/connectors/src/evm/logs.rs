//! Lifting bridge contract logs into neutral events.

use alloy::{primitives::B256, rpc::types::Log, sol_types::SolEvent};
use tricorn_primitives::events::{CrossChainAddress, Event, FundsIn, FundsOut, TransactionInfo};

use super::contract::{from_word, BridgeFundsIn, BridgeFundsOut};
use crate::errors::{ConnectorError, ConnectorResult};

/// Topics of the two bridge events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTopics {
    /// Topic of `BridgeFundsIn`.
    pub fund_in: B256,
    /// Topic of `BridgeFundsOut`.
    pub fund_out: B256,
}

impl Default for EventTopics {
    fn default() -> Self {
        Self {
            fund_in: BridgeFundsIn::SIGNATURE_HASH,
            fund_out: BridgeFundsOut::SIGNATURE_HASH,
        }
    }
}

impl EventTopics {
    /// Both topics, in filter order.
    pub fn as_filter(&self) -> Vec<B256> {
        vec![self.fund_in, self.fund_out]
    }
}

/// Decodes `log` as `E`, whatever topic the contract emitted it under.
fn decode<E: SolEvent>(log: &Log) -> ConnectorResult<E> {
    let topics = std::iter::once(E::SIGNATURE_HASH).chain(log.topics().iter().skip(1).copied());

    E::decode_raw_log(topics, log.data().data.as_ref())
        .map_err(|e| ConnectorError::MalformedEvent(format!("{}: {e}", E::SIGNATURE)))
}

fn tx_info(log: &Log) -> ConnectorResult<TransactionInfo> {
    let hash = log
        .transaction_hash
        .ok_or_else(|| ConnectorError::MalformedEvent("log has no transaction hash".to_string()))?;
    let block_number = log
        .block_number
        .ok_or_else(|| ConnectorError::MalformedEvent("log has no block number".to_string()))?;

    Ok(TransactionInfo {
        hash: hash.to_vec(),
        block_number,
        sender: log.address().to_vec(),
    })
}

/// Parses a log of the bridge contract.
///
/// Fails with [`ConnectorError::BlockchainRework`] for removed logs and with
/// [`ConnectorError::UnknownLogType`] for logs of other events.
pub fn parse_log(log: &Log, topics: &EventTopics) -> ConnectorResult<Event> {
    if log.removed {
        return Err(ConnectorError::BlockchainRework);
    }

    let event_topic = log
        .topics()
        .first()
        .ok_or_else(|| ConnectorError::MalformedEvent("log has no topics".to_string()))?;

    if *event_topic == topics.fund_in {
        let event: BridgeFundsIn = decode(log)?;

        Ok(Event::FundsIn(FundsIn {
            from: event.sender.to_vec(),
            to: CrossChainAddress {
                network_name: event.destinationChain,
                address: event.destinationAddress,
            },
            amount: from_word(event.amount),
            token: event.token.to_vec(),
            tx: tx_info(log)?,
        }))
    } else if *event_topic == topics.fund_out {
        let event: BridgeFundsOut = decode(log)?;

        Ok(Event::FundsOut(FundsOut {
            from: CrossChainAddress {
                network_name: event.sourceChain,
                address: event.sourceAddress,
            },
            to: event.recipient.to_vec(),
            amount: from_word(event.amount),
            token: event.token.to_vec(),
            tx: tx_info(log)?,
        }))
    } else {
        Err(ConnectorError::UnknownLogType(hex::encode(event_topic)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use alloy::primitives::{address, Address, LogData, U256};
    use tricorn_primitives::events::EventType;

    use super::*;

    pub(crate) const BRIDGE: Address = Address::repeat_byte(0xb1);
    pub(crate) const SENDER: Address = address!("7e0f5a592322bc973dde62df3f91604d21d37446");
    pub(crate) const TOKEN: Address = address!("9ff6d0788066982c95d26f4a74d6c700f3dc29ec");
    pub(crate) const SOLANA_ADDRESS: &str = "4zXwdbUDWo1S5AP2CEfv4zAPRds5PQUG1dyqLLvib2xu";

    /// A log of the bridge contract as the node reports it.
    pub(crate) fn bridge_log(data: LogData, block: u64, tx_hash: u8) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: BRIDGE,
                data,
            },
            block_number: Some(block),
            transaction_hash: Some(B256::repeat_byte(tx_hash)),
            ..Default::default()
        }
    }

    pub(crate) fn fund_in_log(block: u64, tx_hash: u8, amount: u128) -> Log {
        let event = BridgeFundsIn {
            sender: SENDER,
            nonce: U256::from(42u64),
            token: TOKEN,
            amount: U256::from(amount),
            stableCommissionPercent: U256::ZERO,
            gasCommission: U256::ZERO,
            destinationChain: "SOLANA".to_string(),
            destinationAddress: SOLANA_ADDRESS.to_string(),
        };

        bridge_log(event.encode_log_data(), block, tx_hash)
    }

    fn fund_out_log() -> Log {
        let event = BridgeFundsOut {
            recipient: SENDER,
            token: Address::repeat_byte(0x44),
            amount: U256::from(500u64),
            transactionId: U256::from(9u64),
            sourceChain: "CASPER-TEST".to_string(),
            sourceAddress: "01ab".to_string(),
        };

        bridge_log(event.encode_log_data(), 7, 0x01)
    }

    #[test]
    fn test_parse_funds_in() {
        let amount = 1_000_000_000_000_000_000_000u128;
        let event = parse_log(&fund_in_log(42, 0xaa, amount), &EventTopics::default())
            .expect("must parse");

        assert_eq!(event.event_type(), EventType::In);
        assert_eq!(event.block(), 42);
        let Event::FundsIn(funds_in) = event else {
            panic!("must be a funds-in event");
        };
        assert_eq!(funds_in.from, SENDER.to_vec());
        assert_eq!(funds_in.token, TOKEN.to_vec());
        assert_eq!(funds_in.amount, ethnum::U256::from(amount));
        assert_eq!(funds_in.to.network_name, "SOLANA");
        assert_eq!(funds_in.to.address, SOLANA_ADDRESS);
        assert_eq!(funds_in.tx.hash, vec![0xaa; 32]);
        assert_eq!(funds_in.tx.sender, BRIDGE.to_vec());
    }

    #[test]
    fn test_parse_funds_out() {
        let Event::FundsOut(funds_out) =
            parse_log(&fund_out_log(), &EventTopics::default()).expect("must parse")
        else {
            panic!("must be a funds-out event");
        };

        assert_eq!(funds_out.to, SENDER.to_vec());
        assert_eq!(funds_out.from.network_name, "CASPER-TEST");
        assert_eq!(funds_out.from.address, "01ab");
        assert_eq!(funds_out.amount, ethnum::U256::from(500u64));
        assert_eq!(funds_out.token, vec![0x44; 20]);
        assert_eq!(funds_out.tx.block_number, 7);
    }

    #[test]
    fn test_configured_topics() {
        let custom = B256::repeat_byte(0xab);
        let topics = EventTopics {
            fund_out: custom,
            ..EventTopics::default()
        };

        let mut log = fund_out_log();
        assert!(
            matches!(parse_log(&log, &topics), Err(ConnectorError::UnknownLogType(_))),
            "the default topic is no longer ours"
        );

        let data = log.inner.data.data.clone();
        let mut logged_topics = log.topics().to_vec();
        logged_topics[0] = custom;
        log.inner.data = LogData::new_unchecked(logged_topics, data);

        let event = parse_log(&log, &topics).expect("must parse under the configured topic");
        assert_eq!(event.event_type(), EventType::Out);
    }

    #[test]
    fn test_removed_and_malformed_logs() {
        let mut log = fund_in_log(1, 0x01, 1);
        log.removed = true;
        assert!(matches!(
            parse_log(&log, &EventTopics::default()),
            Err(ConnectorError::BlockchainRework)
        ));

        let log = fund_in_log(1, 0x01, 1);
        let topics = log.topics().to_vec();
        let mut truncated = log.clone();
        truncated.inner.data = LogData::new_unchecked(topics, vec![0x12, 0x34].into());
        assert!(matches!(
            parse_log(&truncated, &EventTopics::default()),
            Err(ConnectorError::MalformedEvent(_))
        ));

        let mut pending = log;
        pending.transaction_hash = None;
        assert!(matches!(
            parse_log(&pending, &EventTopics::default()),
            Err(ConnectorError::MalformedEvent(_))
        ));

        let unknown = bridge_log(
            LogData::new_unchecked(vec![B256::repeat_byte(0x99)], Default::default()),
            1,
            0x01,
        );
        assert!(matches!(
            parse_log(&unknown, &EventTopics::default()),
            Err(ConnectorError::UnknownLogType(_))
        ));
    }
}
