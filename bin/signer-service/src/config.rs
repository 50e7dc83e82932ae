use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The configuration of the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The directory of the keystore database.
    pub datadir: PathBuf,

    /// The address the signer RPC server binds to.
    pub rpc_addr: String,

    /// Worker threads of the runtime.
    #[serde(default)]
    pub num_threads: Option<u8>,
}
