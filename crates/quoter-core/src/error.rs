//! Error types for quoter-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
