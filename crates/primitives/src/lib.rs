//! Chain-neutral building blocks shared by every bridge component.
//!
//! This crate knows about the closed set of supported networks, how their addresses and hashes are
//! encoded, what a bridge event looks like once it has been lifted off a chain, and how to verify
//! the user signatures that each chain family produces.

pub mod codec;
pub mod constants;
pub mod crypto;
pub mod errors;
pub mod events;
pub mod networks;
pub mod transfer;

pub use ethnum::U256;
