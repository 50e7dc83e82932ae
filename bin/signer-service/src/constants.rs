pub(crate) const DEFAULT_THREAD_COUNT: u8 = 2;

pub(crate) const DB_NAME: &str = "signer.db";
