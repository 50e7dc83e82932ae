use std::time::Duration;

pub(crate) const DEFAULT_THREAD_COUNT: u8 = 4;

pub(crate) const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

pub(crate) const DEFAULT_SIGNER_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) const DB_NAME: &str = "bridge.db";
