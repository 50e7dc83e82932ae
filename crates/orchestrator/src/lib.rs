//! The core of the bridge, responsible for:
//!
//! - Keeping the registry of connected chains and the chore that reads events from each of them.
//! - Turning deposits into releases on the destination chain and tracking every transfer from
//!   WAITING to FINISHED or CANCELLED.
//! - Answering the queries of clients and issuing the signatures users present to the bridge
//!   contracts.

pub mod bridge;
mod chore;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;

#[cfg(test)]
mod testing;

pub use bridge::Bridge;
pub use errors::{BridgeError, BridgeResult};
pub use registry::ConnectorRegistry;
