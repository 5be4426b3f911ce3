//! Wallet error types.

use rust_decimal::Decimal;
use thiserror::Error;

use quoter_core::CoreError;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Insufficient {asset} balance: required {required}, available {available}")]
    InsufficientBalance {
        asset: String,
        required: Decimal,
        available: Decimal,
    },

    #[error("Gas reserve below minimum: {asset} available {available}, minimum {minimum}")]
    InsufficientGas {
        asset: String,
        available: Decimal,
        minimum: Decimal,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type WalletResult<T> = Result<T, WalletError>;
