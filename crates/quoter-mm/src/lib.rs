//! Quote engine for quoter.
//!
//! Turns an order-book snapshot into admissible two-sided quotes:
//! - Mid-price window feeding a return-volatility estimate
//! - Spread recommendation from the risk seam (`QuoteRisk`)
//! - Risk and wallet gates per candidate order
//!
//! # Architecture
//!
//! ```text
//! OrderBook → QuoteEngine.compute()
//!              ├─ MidPriceWindow: push mid, volatility()
//!              ├─ QuoteRisk: recommended spread, order admission
//!              └─ WalletLedger: affordability + gas reserve
//!                   ↓
//!              QuoteOutcome { snapshot, orders, skipped }
//! ```

pub mod config;
pub mod error;
pub mod quote_engine;
pub mod volatility;

pub use config::MakerConfig;
pub use error::{QuoteError, QuoteResult};
pub use quote_engine::{QuoteEngine, QuoteOutcome, QuoteRisk, QuoteSnapshot, SkipReason, SkippedQuote};
pub use volatility::{MidPriceWindow, DEFAULT_VOLATILITY, MID_WINDOW_CAPACITY};
