//! Casper deploys in their binary and JSON forms.
//!
//! Only the subset of the Casper serialization the bridge needs is covered: the standard payment,
//! calls to stored contracts by hash and the CL types of the `bridge_out` arguments.

use chrono::{DateTime, SecondsFormat, Utc};
use ethnum::U256;
use serde_json::{json, Value};
use tricorn_primitives::{constants::CASPER_KEY_ACCOUNT_TAG, crypto::blake2b256};

use crate::errors::{ConnectorError, ConnectorResult};

/// Time to live of outbound deploys, in milliseconds.
pub const DEFAULT_TTL_MILLIS: u64 = 30 * 60 * 1000;

/// Gas price of outbound deploys.
pub const DEFAULT_GAS_PRICE: u64 = 1;

const CL_TYPE_U256: u8 = 7;
const CL_TYPE_U512: u8 = 8;
const CL_TYPE_STRING: u8 = 10;
const CL_TYPE_KEY: u8 = 11;
const CL_TYPE_BYTE_ARRAY: u8 = 15;

const MODULE_BYTES_TAG: u8 = 0;
const STORED_CONTRACT_BY_HASH_TAG: u8 = 1;

fn push_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn push_string(out: &mut Vec<u8>, s: &str) {
    push_bytes(out, s.as_bytes());
}

/// A value of one of the CL types the bridge passes to contracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CLValue {
    /// `U256`.
    U256(U256),
    /// `U512`, bounded to 256 bits here.
    U512(U256),
    /// `String`.
    String(String),
    /// `Key::Account` of an account hash.
    AccountKey([u8; 32]),
    /// `ByteArray` of a fixed length.
    ByteArray(Vec<u8>),
}

impl CLValue {
    /// Serialized value, without the type.
    pub fn value_bytes(&self) -> Vec<u8> {
        match self {
            CLValue::U256(v) | CLValue::U512(v) => {
                let le = v.to_le_bytes();
                let len = le.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
                let mut out = vec![len as u8];
                out.extend_from_slice(&le[..len]);
                out
            }
            CLValue::String(s) => {
                let mut out = Vec::with_capacity(4 + s.len());
                push_string(&mut out, s);
                out
            }
            CLValue::AccountKey(hash) => {
                let mut out = vec![CASPER_KEY_ACCOUNT_TAG];
                out.extend_from_slice(hash);
                out
            }
            CLValue::ByteArray(bytes) => bytes.clone(),
        }
    }

    fn type_bytes(&self) -> Vec<u8> {
        match self {
            CLValue::U256(_) => vec![CL_TYPE_U256],
            CLValue::U512(_) => vec![CL_TYPE_U512],
            CLValue::String(_) => vec![CL_TYPE_STRING],
            CLValue::AccountKey(_) => vec![CL_TYPE_KEY],
            CLValue::ByteArray(bytes) => {
                let mut out = vec![CL_TYPE_BYTE_ARRAY];
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out
            }
        }
    }

    fn type_json(&self) -> Value {
        match self {
            CLValue::U256(_) => json!("U256"),
            CLValue::U512(_) => json!("U512"),
            CLValue::String(_) => json!("String"),
            CLValue::AccountKey(_) => json!("Key"),
            CLValue::ByteArray(bytes) => json!({ "ByteArray": bytes.len() }),
        }
    }

    /// Serialized value followed by its type.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        push_bytes(&mut out, &self.value_bytes());
        out.extend_from_slice(&self.type_bytes());
        out
    }

    fn to_json(&self) -> Value {
        json!({
            "cl_type": self.type_json(),
            "bytes": hex::encode(self.value_bytes()),
            "parsed": Value::Null,
        })
    }
}

/// A named argument of a contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedArg {
    /// Argument name.
    pub name: String,
    /// Argument value.
    pub value: CLValue,
}

impl NamedArg {
    /// Creates an argument.
    pub fn new(name: &str, value: CLValue) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

fn args_bytes(args: &[NamedArg]) -> Vec<u8> {
    let mut out = (args.len() as u32).to_le_bytes().to_vec();
    for arg in args {
        push_string(&mut out, &arg.name);
        out.extend_from_slice(&arg.value.to_bytes());
    }
    out
}

fn args_json(args: &[NamedArg]) -> Value {
    Value::Array(
        args.iter()
            .map(|arg| json!([arg.name, arg.value.to_json()]))
            .collect(),
    )
}

/// Code run by a deploy, as payment or as session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableDeployItem {
    /// Wasm module, the empty module selects the standard payment.
    ModuleBytes {
        /// Wasm bytes.
        module_bytes: Vec<u8>,
        /// Runtime arguments.
        args: Vec<NamedArg>,
    },
    /// Entry point of a stored contract.
    StoredContractByHash {
        /// Contract hash.
        hash: [u8; 32],
        /// Called entry point.
        entry_point: String,
        /// Runtime arguments.
        args: Vec<NamedArg>,
    },
}

impl ExecutableDeployItem {
    /// Standard payment of `amount` motes.
    pub fn standard_payment(amount: u64) -> Self {
        ExecutableDeployItem::ModuleBytes {
            module_bytes: Vec::new(),
            args: vec![NamedArg::new("amount", CLValue::U512(U256::from(amount)))],
        }
    }

    /// Binary serialization.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ExecutableDeployItem::ModuleBytes { module_bytes, args } => {
                let mut out = vec![MODULE_BYTES_TAG];
                push_bytes(&mut out, module_bytes);
                out.extend_from_slice(&args_bytes(args));
                out
            }
            ExecutableDeployItem::StoredContractByHash {
                hash,
                entry_point,
                args,
            } => {
                let mut out = vec![STORED_CONTRACT_BY_HASH_TAG];
                out.extend_from_slice(hash);
                push_string(&mut out, entry_point);
                out.extend_from_slice(&args_bytes(args));
                out
            }
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ExecutableDeployItem::ModuleBytes { module_bytes, args } => json!({
                "ModuleBytes": {
                    "module_bytes": hex::encode(module_bytes),
                    "args": args_json(args),
                }
            }),
            ExecutableDeployItem::StoredContractByHash {
                hash,
                entry_point,
                args,
            } => json!({
                "StoredContractByHash": {
                    "hash": hex::encode(hash),
                    "entry_point": entry_point,
                    "args": args_json(args),
                }
            }),
        }
    }
}

/// Header of a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployHeader {
    /// Tagged public key of the sender.
    pub account: Vec<u8>,
    /// Creation time, in milliseconds since the epoch.
    pub timestamp: u64,
    /// Time to live, in milliseconds.
    pub ttl: u64,
    /// Gas price.
    pub gas_price: u64,
    /// Hash of the payment and session.
    pub body_hash: [u8; 32],
    /// Deploys that must be executed first.
    pub dependencies: Vec<[u8; 32]>,
    /// Chain the deploy is bound to.
    pub chain_name: String,
}

impl DeployHeader {
    /// Binary serialization.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.account.clone();
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.ttl.to_le_bytes());
        out.extend_from_slice(&self.gas_price.to_le_bytes());
        out.extend_from_slice(&self.body_hash);
        out.extend_from_slice(&(self.dependencies.len() as u32).to_le_bytes());
        for dependency in &self.dependencies {
            out.extend_from_slice(dependency);
        }
        push_string(&mut out, &self.chain_name);
        out
    }

    fn to_json(&self) -> ConnectorResult<Value> {
        let timestamp = i64::try_from(self.timestamp)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| {
                ConnectorError::InvalidConfig(format!("timestamp {} out of range", self.timestamp))
            })?;

        Ok(json!({
            "account": hex::encode(&self.account),
            "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "ttl": format_ttl(self.ttl),
            "gas_price": self.gas_price,
            "body_hash": hex::encode(self.body_hash),
            "dependencies": self.dependencies.iter().map(hex::encode).collect::<Vec<_>>(),
            "chain_name": self.chain_name,
        }))
    }
}

fn format_ttl(millis: u64) -> String {
    if millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else {
        format!("{millis}ms")
    }
}

/// A signature over the deploy hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    /// Tagged public key of the signer.
    pub signer: Vec<u8>,
    /// Tagged signature.
    pub signature: Vec<u8>,
}

/// A deploy ready to be approved and submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deploy {
    /// Hash of the header, the message approvals sign.
    pub hash: [u8; 32],
    /// Header.
    pub header: DeployHeader,
    /// Payment code.
    pub payment: ExecutableDeployItem,
    /// Session code.
    pub session: ExecutableDeployItem,
    /// Collected approvals.
    pub approvals: Vec<Approval>,
}

impl Deploy {
    /// Builds an unapproved deploy with the default ttl and gas price.
    pub fn new(
        account: Vec<u8>,
        timestamp: u64,
        chain_name: &str,
        payment: ExecutableDeployItem,
        session: ExecutableDeployItem,
    ) -> Self {
        let mut body = payment.to_bytes();
        body.extend_from_slice(&session.to_bytes());

        let header = DeployHeader {
            account,
            timestamp,
            ttl: DEFAULT_TTL_MILLIS,
            gas_price: DEFAULT_GAS_PRICE,
            body_hash: blake2b256(body),
            dependencies: Vec::new(),
            chain_name: chain_name.to_string(),
        };

        Self {
            hash: blake2b256(header.to_bytes()),
            header,
            payment,
            session,
            approvals: Vec::new(),
        }
    }

    /// Adds an approval.
    pub fn approve(&mut self, signer: Vec<u8>, signature: Vec<u8>) {
        self.approvals.push(Approval { signer, signature });
    }

    /// JSON form accepted by `account_put_deploy`.
    pub fn to_json(&self) -> ConnectorResult<Value> {
        let approvals: Vec<Value> = self
            .approvals
            .iter()
            .map(|a| {
                json!({
                    "signer": hex::encode(&a.signer),
                    "signature": hex::encode(&a.signature),
                })
            })
            .collect();

        Ok(json!({
            "hash": hex::encode(self.hash),
            "header": self.header.to_json()?,
            "payment": self.payment.to_json(),
            "session": self.session.to_json(),
            "approvals": approvals,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cl_values() {
        // 2.5 CSPR.
        assert_eq!(
            hex::encode(CLValue::U512(U256::from(2_500_000_000u64)).value_bytes()),
            "0400f90295"
        );
        assert_eq!(hex::encode(CLValue::U256(U256::ZERO).value_bytes()), "00");
        assert_eq!(
            hex::encode(CLValue::String("ab".to_string()).to_bytes()),
            "060000000200000061620a"
        );
        assert_eq!(
            CLValue::AccountKey([7; 32]).to_bytes()[4..6],
            [CASPER_KEY_ACCOUNT_TAG, 7]
        );

        let array = CLValue::ByteArray(vec![1; 32]).to_bytes();
        assert_eq!(array[array.len() - 5..], [CL_TYPE_BYTE_ARRAY, 32, 0, 0, 0]);
    }

    #[test]
    fn test_deploy_hashes() {
        let payment = ExecutableDeployItem::standard_payment(2_500_000_000);
        let session = ExecutableDeployItem::StoredContractByHash {
            hash: [0x23; 32],
            entry_point: "bridge_out".to_string(),
            args: vec![NamedArg::new("amount", CLValue::U256(U256::from(10u64)))],
        };
        let mut account = vec![1];
        account.extend_from_slice(&[0xaa; 32]);

        let mut deploy = Deploy::new(
            account,
            1_672_943_628_000,
            "casper-test",
            payment.clone(),
            session.clone(),
        );

        let mut body = payment.to_bytes();
        body.extend_from_slice(&session.to_bytes());
        assert_eq!(deploy.header.body_hash, blake2b256(body));
        assert_eq!(deploy.hash, blake2b256(deploy.header.to_bytes()));

        deploy.approve(vec![1; 33], vec![1; 65]);
        let json = deploy.to_json().expect("must render");
        assert_eq!(json["header"]["ttl"], "30m");
        assert_eq!(json["header"]["timestamp"], "2023-01-05T18:33:48.000Z");
        assert_eq!(json["header"]["chain_name"], "casper-test");
        assert_eq!(
            json["session"]["StoredContractByHash"]["entry_point"],
            "bridge_out"
        );
        assert_eq!(
            json["payment"]["ModuleBytes"]["args"][0][1]["bytes"],
            "0400f90295"
        );
        assert_eq!(json["approvals"].as_array().map(Vec::len), Some(1));
    }
}
