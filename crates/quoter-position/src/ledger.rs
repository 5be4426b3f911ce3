//! Signed net position per symbol plus the trade log that produced it.
//!
//! Invariant: `get(symbol)` always equals the sum of signed quantities of
//! every trade logged for that symbol. Records are never modified or removed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use quoter_core::{OrderSide, Price, Size, Symbol};

// ============================================================================
// TradeRecord
// ============================================================================

/// Immutable record of one position update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: Symbol,
    pub quantity: Size,
    pub price: Price,
    pub side: OrderSide,
    /// Net position for `symbol` right after this trade.
    pub resulting_position: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    /// Signed contribution of this trade to the net position.
    #[must_use]
    pub fn delta(&self) -> Decimal {
        self.side.signed(self.quantity)
    }
}

// ============================================================================
// PositionLedger
// ============================================================================

/// Per-symbol signed position tracker.
#[derive(Debug, Default, Clone)]
pub struct PositionLedger {
    positions: HashMap<Symbol, Decimal>,
    trades: Vec<TradeRecord>,
}

impl PositionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a trade and append it to the log.
    ///
    /// Zero-quantity trades leave the position unchanged but are still logged.
    pub fn update(&mut self, symbol: &Symbol, quantity: Size, price: Price, side: OrderSide) {
        let delta = side.signed(quantity);
        let position = self.positions.entry(symbol.clone()).or_insert(Decimal::ZERO);
        *position += delta;
        let resulting_position = *position;

        debug!(
            symbol = %symbol,
            side = %side,
            quantity = %quantity,
            price = %price,
            position = %resulting_position,
            "Position updated"
        );

        self.trades.push(TradeRecord {
            symbol: symbol.clone(),
            quantity,
            price,
            side,
            resulting_position,
            timestamp: Utc::now(),
        });
    }

    /// Net position, zero for symbols never traded.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Decimal {
        self.positions.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn trades_for<'a>(&'a self, symbol: &'a Symbol) -> impl Iterator<Item = &'a TradeRecord> + 'a {
        self.trades.iter().filter(move |t| &t.symbol == symbol)
    }

    #[must_use]
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}
