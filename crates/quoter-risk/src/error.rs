//! Risk error types.

use thiserror::Error;

use quoter_wallet::WalletError;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Risk limits not configured for {0}")]
    LimitsNotConfigured(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Arithmetic overflow: {0}")]
    Arithmetic(String),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
}

pub type RiskResult<T> = Result<T, RiskError>;
