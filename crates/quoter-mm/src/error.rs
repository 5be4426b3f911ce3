//! Quote engine error types.

use thiserror::Error;

use quoter_risk::RiskError;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Spread recommendation failed: {0}")]
    Spread(#[from] RiskError),

    #[error("Quote price overflow: {0}")]
    Overflow(String),

    #[error("Invalid maker configuration: {0}")]
    InvalidConfig(String),
}

pub type QuoteResult<T> = Result<T, QuoteError>;
