//! Error objects returned by the servers.

use jsonrpsee::types::{ErrorCode, ErrorObjectOwned};

/// Application code of errors the caller can fix, e.g. a missing key.
pub const FAILED_PRECONDITION_CODE: i32 = -32001;

/// Malformed or unsupported parameters.
pub fn invalid_params(message: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(ErrorCode::InvalidParams.code(), message.into(), None::<()>)
}

/// A precondition of the operation does not hold.
pub fn failed_precondition(message: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(FAILED_PRECONDITION_CODE, message.into(), None::<()>)
}

/// Anything else.
pub fn internal(message: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(ErrorCode::InternalError.code(), message.into(), None::<()>)
}
