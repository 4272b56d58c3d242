use std::time::Duration;

use thiserror::Error;

use crate::chain::RequestId;

pub type Result<T, E = BlocklockError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BlocklockError {
    /// Malformed height, identity, address or ciphertext field.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Submission or confirmation of a transaction failed.
    #[error("transaction error: {0:#}")]
    Transaction(anyhow::Error),
    /// Observed log count breaks the at-most-one-per-request rule.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("cannot find a request with identifier {0}")]
    NotFound(RequestId),
    #[error("timed out after {after:?} waiting for decryption of request {request_id}")]
    Timeout {
        request_id: RequestId,
        after: Duration,
    },
    #[error("identity encryption primitive failed: {0:#}")]
    ExternalCrypto(anyhow::Error),
    /// Any other failure of the connectivity layer, passed through as is.
    #[error(transparent)]
    Connection(anyhow::Error),
}

impl BlocklockError {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn violation<S: Into<String>>(message: S) -> Self {
        Self::ProtocolViolation(message.into())
    }
}
