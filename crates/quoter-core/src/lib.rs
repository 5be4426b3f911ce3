//! Core domain types for the quoter market-making engine.
//!
//! This crate provides fundamental types used throughout the trading system:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `Symbol`, `AssetPair`, `SymbolParser`: Trading pair identification
//! - `OrderBook`, `BookLevel`: Order book snapshots from the venue
//! - `OrderSide`, `OrderType`, `Order`: Trading enums and order records

pub mod book;
pub mod decimal;
pub mod error;
pub mod market;
pub mod order;

pub use book::{BookLevel, OrderBook};
pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market::{AssetPair, Symbol, SymbolParser, DEFAULT_QUOTE_ASSETS};
pub use order::{
    ClientOrderId, Order, OrderId, OrderRequest, OrderSide, OrderStatus, OrderType,
};
