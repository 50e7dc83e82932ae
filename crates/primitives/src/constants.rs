//! Protocol-wide constants.

/// Message a user signs to prove ownership of an address when querying their history.
pub const AUTH_MESSAGE_BODY: &str = "Bridge Authentication Proof";

/// Prefix prepended by Casper wallets to every message before signing.
pub const CASPER_MESSAGE_PREFIX: &str = "Casper Message:\n";

/// Prefix of the Ethereum signed-message envelope.
pub const ETHEREUM_SIGNED_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Length in bytes of an account address on EVM networks.
pub const EVM_ADDRESS_LENGTH: usize = 20;

/// Length in bytes of a public key on Casper networks, without the algorithm tag.
pub const CASPER_ADDRESS_LENGTH: usize = 32;

/// Length in bytes of a transaction or block hash on EVM networks.
pub const EVM_HASH_LENGTH: usize = 32;

/// Length in bytes of a deploy or block hash on Casper networks.
pub const CASPER_HASH_LENGTH: usize = 32;

/// Algorithm tag of an Ed25519 Casper public key.
pub const CASPER_TAG_ED25519: u8 = 0x01;

/// Algorithm tag of a secp256k1 Casper public key.
pub const CASPER_TAG_SECP256K1: u8 = 0x02;

/// Tag of a Casper `Key::Account` value.
pub const CASPER_KEY_ACCOUNT_TAG: u8 = 0x00;

/// Tag of a Casper `Key::Hash` value.
pub const CASPER_KEY_HASH_TAG: u8 = 0x01;

/// Decimals of the tokens handled by the bridge unless the token says otherwise.
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;
