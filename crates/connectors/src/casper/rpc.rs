//! Access to a Casper node.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use jsonrpsee::{
    core::{client::ClientT, params::ObjectParams},
    http_client::{HttpClient, HttpClientBuilder},
    rpc_params,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::trace;

use crate::errors::{ConnectorError, ConnectorResult};

/// Key under which a transform carries a written CLValue.
pub const WRITE_CL_VALUE_KEY: &str = "WriteCLValue";

/// Key of the serialized bytes inside a written CLValue.
pub const BYTES_KEY: &str = "bytes";

/// The parts of a block the connector scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasperBlock {
    /// Block hash, hex encoded.
    pub hash: String,
    /// Block height.
    pub height: u64,
    /// Deploys included in the block, hex encoded.
    pub deploy_hashes: Vec<String>,
}

/// A deploy and its execution results.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployInfo {
    /// Deploy hash, hex encoded.
    pub hash: String,
    /// Tagged public key of the account that sent the deploy, hex encoded.
    pub account: String,
    /// One result per block the deploy was executed in.
    pub execution_results: Vec<ExecutionResult>,
}

/// Execution of a deploy in a block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecutionResult {
    /// Block the deploy was executed in.
    pub block_hash: String,
    /// Outcome of the execution.
    pub result: ExecutionOutcome,
}

/// Outcome of a deploy execution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum ExecutionOutcome {
    /// The deploy succeeded and produced these effects.
    Success {
        /// Effects of the execution.
        effect: Effect,
    },
    /// The deploy failed.
    Failure {
        /// Reason reported by the node.
        error_message: String,
    },
}

/// Global state changes of an execution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Effect {
    /// Changes, one per key.
    #[serde(default)]
    pub transforms: Vec<TransformEntry>,
}

/// A change of one global state key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransformEntry {
    /// Changed key, as rendered by the node.
    pub key: String,
    /// The change.
    pub transform: Value,
}

impl TransformEntry {
    /// Serialized bytes of the written CLValue, if the transform is a CLValue write.
    pub fn written_bytes(&self) -> Option<&str> {
        self.transform
            .get(WRITE_CL_VALUE_KEY)?
            .get(BYTES_KEY)?
            .as_str()
    }
}

/// The node methods the connector relies on.
#[async_trait]
pub trait CasperRpc: Debug + Send + Sync {
    /// Height of the latest block.
    async fn latest_block_height(&self) -> ConnectorResult<u64>;

    /// The block at `height`.
    async fn block_by_height(&self, height: u64) -> ConnectorResult<CasperBlock>;

    /// Height of the block with the given hash.
    async fn block_height_by_hash(&self, hash: &str) -> ConnectorResult<u64>;

    /// The deploy with the given hash.
    async fn deploy(&self, hash: &str) -> ConnectorResult<DeployInfo>;

    /// Submits a signed deploy, returns its hash.
    async fn put_deploy(&self, deploy: &Value) -> ConnectorResult<String>;
}

#[derive(Debug, Deserialize)]
struct BlockResponse {
    block: Option<JsonBlock>,
}

#[derive(Debug, Deserialize)]
struct JsonBlock {
    hash: String,
    header: JsonBlockHeader,
    body: JsonBlockBody,
}

#[derive(Debug, Deserialize)]
struct JsonBlockHeader {
    height: u64,
}

#[derive(Debug, Deserialize)]
struct JsonBlockBody {
    #[serde(default)]
    deploy_hashes: Vec<String>,
}

impl BlockResponse {
    fn into_block(self) -> ConnectorResult<CasperBlock> {
        let block = self
            .block
            .ok_or_else(|| ConnectorError::UnexpectedResponse("node returned no block".to_string()))?;

        Ok(CasperBlock {
            hash: block.hash,
            height: block.header.height,
            deploy_hashes: block.body.deploy_hashes,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DeployResponse {
    deploy: JsonDeploy,
    #[serde(default)]
    execution_results: Vec<ExecutionResult>,
}

#[derive(Debug, Deserialize)]
struct JsonDeploy {
    hash: String,
    header: JsonDeployHeader,
}

#[derive(Debug, Deserialize)]
struct JsonDeployHeader {
    account: String,
}

impl From<DeployResponse> for DeployInfo {
    fn from(value: DeployResponse) -> Self {
        Self {
            hash: value.deploy.hash,
            account: value.deploy.header.account,
            execution_results: value.execution_results,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PutDeployResponse {
    deploy_hash: String,
}

/// [`CasperRpc`] over a JSON-RPC HTTP client.
#[derive(Debug, Clone)]
pub struct HttpCasperRpc {
    client: HttpClient,
}

impl HttpCasperRpc {
    /// Builds a client for `url`.
    pub fn new(url: &str, request_timeout: Duration) -> ConnectorResult<Self> {
        let client = HttpClientBuilder::default()
            .request_timeout(request_timeout)
            .build(url)?;

        Ok(Self { client })
    }

    async fn block(&self, identifier: Value) -> ConnectorResult<CasperBlock> {
        let mut params = ObjectParams::new();
        params.insert("block_identifier", identifier)?;

        let response: BlockResponse = self.client.request("chain_get_block", params).await?;
        response.into_block()
    }
}

#[async_trait]
impl CasperRpc for HttpCasperRpc {
    async fn latest_block_height(&self) -> ConnectorResult<u64> {
        let response: BlockResponse = self.client.request("chain_get_block", rpc_params![]).await?;
        Ok(response.into_block()?.height)
    }

    async fn block_by_height(&self, height: u64) -> ConnectorResult<CasperBlock> {
        trace!(height, "fetching block");
        self.block(json!({ "Height": height })).await
    }

    async fn block_height_by_hash(&self, hash: &str) -> ConnectorResult<u64> {
        Ok(self.block(json!({ "Hash": hash })).await?.height)
    }

    async fn deploy(&self, hash: &str) -> ConnectorResult<DeployInfo> {
        let mut params = ObjectParams::new();
        params.insert("deploy_hash", hash)?;

        let response: DeployResponse = self.client.request("info_get_deploy", params).await?;
        Ok(response.into())
    }

    async fn put_deploy(&self, deploy: &Value) -> ConnectorResult<String> {
        let mut params = ObjectParams::new();
        params.insert("deploy", deploy)?;

        let response: PutDeployResponse = self.client.request("account_put_deploy", params).await?;
        Ok(response.deploy_hash)
    }
}
