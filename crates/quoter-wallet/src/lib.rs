//! Wallet balance accounting.
//!
//! Tracks `total` and `reserved` per asset and answers affordability
//! questions for candidate orders, including the gas-asset reserve every
//! order must leave untouched.

pub mod config;
pub mod error;
pub mod ledger;

pub use config::WalletConfig;
pub use error::{WalletError, WalletResult};
pub use ledger::{WalletBalance, WalletLedger};
