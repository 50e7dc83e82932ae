//! Fixture rows for test deployments.

use anyhow::Context;
use tracing::info;
use tricorn_db::{
    networks::{NetworkToken, NetworkTokenDb, TokenDb},
    BridgeDb,
};
use tricorn_primitives::{codec::string_to_bytes, networks::Network};

const SHORT_NAME: &str = "TST";

const LONG_NAME: &str = "TEST";

const DECIMALS: u32 = 18;

/// Where the fixture token is deployed.
const CONTRACTS: [(Network, &str); 2] = [
    (
        Network::CasperTest,
        "hash-3c0c1847d1c410338ab9b4ee0919c181cf26085997ff9c797e8a1ae5b02ddf23",
    ),
    (Network::Goerli, "0E26df2BaaFBC976a104EE3cccf1B467ff1b7a68"),
];

/// Registers the fixture token on the test networks, returning its id.
///
/// Seeding an already seeded database changes nothing.
pub(crate) async fn seed(db: &impl BridgeDb) -> anyhow::Result<i64> {
    let (anchor, _) = CONTRACTS[0];
    let existing = db
        .tokens_on_network(anchor.id())
        .await?
        .into_iter()
        .find(|token| token.short_name == SHORT_NAME);
    if let Some(token) = existing {
        info!(token = token.id, "database already seeded");
        return Ok(token.id);
    }

    let token_id = db.create_token(SHORT_NAME, LONG_NAME).await?;
    for (network, contract) in CONTRACTS {
        let contract_address = string_to_bytes(network, contract)
            .with_context(|| format!("decode contract of {network}"))?;

        db.put_network_token(&NetworkToken {
            network_id: network.id(),
            token_id,
            contract_address,
            decimals: DECIMALS,
        })
        .await?;
    }

    info!(token = token_id, "database seeded");
    Ok(token_id)
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;
    use tricorn_db::persistent::{config::DbConfig, sqlite::SqliteDb};

    use super::*;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .expect("must open in-memory database");
        tricorn_db::MIGRATOR.run(&pool).await.expect("must migrate");
        let db = SqliteDb::new(pool, DbConfig::default());

        let first = seed(&db).await.expect("must seed");
        let second = seed(&db).await.expect("must seed again");
        assert_eq!(first, second, "seeding twice must not create a second token");

        let contracts = db.network_tokens(first).await.expect("must query");
        assert_eq!(contracts.len(), 2);

        let goerli = db
            .network_token(Network::Goerli.id(), first)
            .await
            .expect("must query")
            .expect("goerli contract must exist");
        assert_eq!(goerli.contract_address.len(), 20);
        assert_eq!(goerli.decimals, 18);

        let casper = db
            .network_token(Network::CasperTest.id(), first)
            .await
            .expect("must query")
            .expect("casper contract must exist");
        assert_eq!(casper.contract_address.len(), 32, "the hash- prefix must be stripped");
    }
}
