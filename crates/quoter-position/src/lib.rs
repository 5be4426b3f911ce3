//! Position accounting for market-making jobs.
//!
//! Each job owns one `PositionLedger`. The owning loop is the only writer,
//! so the ledger carries no locking of its own.

pub mod ledger;

pub use ledger::{PositionLedger, TradeRecord};
