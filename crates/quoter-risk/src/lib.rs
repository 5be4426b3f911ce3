//! Risk admission for market-making orders.
//!
//! Every candidate order must pass, in order:
//! - MaxOrderSize: quantity within the per-symbol order cap
//! - PositionLimit: resulting |position| within min(static cap, dynamic cap)
//! - BalanceRatio: the trade does not move the wallet away from its target
//!   base/quote value ratio
//!
//! Any failure to evaluate (missing limits, unparseable symbol) rejects the
//! order. The manager also recommends the quoting spread for a symbol.

pub mod error;
pub mod limits;
pub mod manager;
pub mod portfolio;

pub use error::{RiskError, RiskResult};
pub use limits::{RiskConfig, RiskLimits};
pub use manager::{RejectReason, RiskDecision, RiskManager, DYNAMIC_LIMIT_FRACTION};
pub use portfolio::Portfolio;
