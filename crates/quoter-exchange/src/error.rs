//! Exchange error types.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Malformed venue response: {0}")]
    MalformedResponse(String),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
