//! JSON-RPC interface of the bridge and of the signer.
//!
//! The bridge API serves wallets and the gateway: network and token listings, transfer lookups,
//! estimations and the signatures users present to the bridge contracts. The signer API is the
//! transport between the bridge and the custodial signer process.

pub mod errors;
pub mod server;
pub mod traits;
pub mod types;

pub use server::RpcServer;
