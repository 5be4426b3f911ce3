//! Venue abstraction for quoter.
//!
//! `ExchangeClient` is the only surface the market-making loop uses to talk
//! to a venue. It is dyn-compatible (boxed futures) so jobs can share one
//! `Arc<dyn ExchangeClient>`.
//!
//! `PaperExchange` is an in-memory venue used by tests and paper trading.

pub mod client;
pub mod error;
pub mod paper;

pub use client::{AccountInfo, BoxFuture, DynExchangeClient, ExchangeClient, PlaceOrderAck};
pub use error::{ExchangeError, ExchangeResult};
pub use paper::{synthetic_book, PaperExchange};
