//! The closed set of networks the bridge can be connected to.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::CodecError;

/// Family of a network. Determines address encoding, signature scheme and connector kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NetworkType {
    /// EVM compatible network.
    #[serde(rename = "NT_EVM")]
    Evm,
    /// Casper network.
    #[serde(rename = "NT_CASPER")]
    Casper,
    /// Solana network.
    #[serde(rename = "NT_SOLANA")]
    Solana,
}

impl NetworkType {
    /// All supported network types.
    pub const ALL: [NetworkType; 3] = [NetworkType::Evm, NetworkType::Casper, NetworkType::Solana];

    /// Numeric identifier of the type, as stored in the signer keystore.
    pub const fn id(&self) -> u32 {
        match self {
            NetworkType::Evm => 0,
            NetworkType::Casper => 1,
            NetworkType::Solana => 2,
        }
    }

    /// Wire name of the type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Evm => "NT_EVM",
            NetworkType::Casper => "NT_CASPER",
            NetworkType::Solana => "NT_SOLANA",
        }
    }
}

impl TryFrom<u32> for NetworkType {
    type Error = CodecError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NetworkType::Evm),
            1 => Ok(NetworkType::Casper),
            2 => Ok(NetworkType::Solana),
            other => Err(CodecError::UnsupportedNetworkType(other.to_string())),
        }
    }
}

impl FromStr for NetworkType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetworkType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CodecError::UnsupportedNetworkType(s.to_owned()))
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A supported network.
///
/// The identifier, the wire name and the type of each network are fixed; the maps between them
/// are total and bijective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Network {
    /// Casper mainnet.
    Casper,
    /// Ethereum mainnet.
    Eth,
    /// Solana mainnet.
    Solana,
    /// Polygon mainnet.
    Polygon,
    /// Casper testnet.
    CasperTest,
    /// Goerli, the Ethereum testnet.
    Goerli,
    /// Solana testnet.
    SolanaTest,
    /// Mumbai, the Polygon testnet.
    Mumbai,
    /// BNB smart chain mainnet.
    Bnb,
    /// BNB smart chain testnet.
    BnbTest,
    /// Avalanche mainnet.
    Avalanche,
    /// Avalanche testnet.
    AvalancheTest,
}

impl Network {
    /// Every supported network, ordered by identifier.
    pub const ALL: [Network; 12] = [
        Network::Casper,
        Network::Eth,
        Network::Solana,
        Network::Polygon,
        Network::CasperTest,
        Network::Goerli,
        Network::SolanaTest,
        Network::Mumbai,
        Network::Bnb,
        Network::BnbTest,
        Network::Avalanche,
        Network::AvalancheTest,
    ];

    /// Numeric identifier of the network.
    pub const fn id(&self) -> u32 {
        match self {
            Network::Casper => 0,
            Network::Eth => 1,
            Network::Solana => 2,
            Network::Polygon => 3,
            Network::CasperTest => 4,
            Network::Goerli => 5,
            Network::SolanaTest => 6,
            Network::Mumbai => 7,
            Network::Bnb => 8,
            Network::BnbTest => 9,
            Network::Avalanche => 10,
            Network::AvalancheTest => 11,
        }
    }

    /// Wire name of the network.
    pub const fn name(&self) -> &'static str {
        match self {
            Network::Casper => "CASPER",
            Network::Eth => "ETH",
            Network::Solana => "SOLANA",
            Network::Polygon => "POLYGON",
            Network::CasperTest => "CASPER-TEST",
            Network::Goerli => "GOERLI",
            Network::SolanaTest => "SOLANA-TEST",
            Network::Mumbai => "MUMBAI",
            Network::Bnb => "BNB",
            Network::BnbTest => "BNB-TEST",
            Network::Avalanche => "AVALANCHE",
            Network::AvalancheTest => "AVALANCHE-TEST",
        }
    }

    /// Family of the network.
    pub const fn network_type(&self) -> NetworkType {
        match self {
            Network::Casper | Network::CasperTest => NetworkType::Casper,
            Network::Solana | Network::SolanaTest => NetworkType::Solana,
            _ => NetworkType::Evm,
        }
    }

    /// Whether the network is a testnet.
    pub const fn is_testnet(&self) -> bool {
        matches!(
            self,
            Network::Mumbai
                | Network::CasperTest
                | Network::Goerli
                | Network::SolanaTest
                | Network::BnbTest
                | Network::AvalancheTest
        )
    }

    /// Looks up a network by identifier.
    pub fn from_id(id: u32) -> Result<Self, CodecError> {
        Network::ALL
            .into_iter()
            .find(|n| n.id() == id)
            .ok_or(CodecError::UnsupportedNetworkId(id))
    }

    /// Looks up a network by wire name.
    pub fn from_name(name: &str) -> Result<Self, CodecError> {
        Network::ALL
            .into_iter()
            .find(|n| n.name() == name)
            .ok_or_else(|| CodecError::UnsupportedNetworkName(name.to_owned()))
    }

    /// Validates that `name` is the wire name of a supported network.
    pub fn validate(name: &str) -> Result<(), CodecError> {
        Network::from_name(name).map(|_| ())
    }
}

impl FromStr for Network {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::from_name(s)
    }
}

impl TryFrom<String> for Network {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Network::from_name(&value)
    }
}

impl From<Network> for String {
    fn from(value: Network) -> Self {
        value.name().to_owned()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of a connected network, reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// The network.
    pub network: Network,

    /// Address of the chain node the connector talks to.
    pub node_address: String,

    /// Address of the token contract on this network.
    pub token_contract: String,

    /// Address of the bridge contract on this network.
    pub bridge_contract: String,

    /// Gas limit used by outbound transactions.
    pub gas_limit: u64,
}

impl NetworkDescriptor {
    /// Numeric identifier of the described network.
    pub const fn id(&self) -> u32 {
        self.network.id()
    }

    /// Wire name of the described network.
    pub const fn name(&self) -> &'static str {
        self.network.name()
    }

    /// Family of the described network.
    pub const fn network_type(&self) -> NetworkType {
        self.network.network_type()
    }

    /// Whether the described network is a testnet.
    pub const fn is_testnet(&self) -> bool {
        self.network.is_testnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        for network in Network::ALL {
            assert!(
                Network::validate(network.name()).is_ok(),
                "{network} must be a valid name"
            );
        }

        for bogus in ["", "casper", "ETH ", "SOLANA_TEST", "TRON"] {
            assert_eq!(
                Network::validate(bogus),
                Err(CodecError::UnsupportedNetworkName(bogus.to_owned())),
                "{bogus:?} must be rejected"
            );
        }
    }

    #[test]
    fn test_maps_are_bijective() {
        for (idx, network) in Network::ALL.into_iter().enumerate() {
            assert_eq!(network.id() as usize, idx, "ids must follow declaration order");
            assert_eq!(Network::from_id(network.id()), Ok(network));
            assert_eq!(Network::from_name(network.name()), Ok(network));
        }

        assert!(Network::from_id(12).is_err(), "id 12 must be unsupported");
    }

    #[test]
    fn test_types_and_testnets() {
        assert_eq!(Network::Casper.network_type(), NetworkType::Casper);
        assert_eq!(Network::CasperTest.network_type(), NetworkType::Casper);
        assert_eq!(Network::SolanaTest.network_type(), NetworkType::Solana);
        assert_eq!(Network::Bnb.network_type(), NetworkType::Evm);
        assert_eq!(Network::AvalancheTest.network_type(), NetworkType::Evm);

        let testnets = Network::ALL
            .into_iter()
            .filter(Network::is_testnet)
            .collect::<Vec<_>>();
        assert_eq!(
            testnets,
            vec![
                Network::CasperTest,
                Network::Goerli,
                Network::SolanaTest,
                Network::Mumbai,
                Network::BnbTest,
                Network::AvalancheTest,
            ]
        );
    }

    #[test]
    fn test_network_type_ids() {
        for t in NetworkType::ALL {
            assert_eq!(NetworkType::try_from(t.id()), Ok(t));
            assert_eq!(t.as_str().parse::<NetworkType>(), Ok(t));
        }
        assert!(NetworkType::try_from(3).is_err());
    }
}
