//! Order book snapshots.

use serde::{Deserialize, Serialize};

use crate::decimal::{Price, Size};

/// Single price level.
///
/// Deserializes from either a `{price, size}` map or the `[price, size]`
/// pair most venues return. Decimal strings and JSON numbers both parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub size: Size,
}

impl BookLevel {
    pub fn new(price: Price, size: Size) -> Self {
        Self { price, size }
    }
}

/// Order book snapshot, both sides sorted best-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    pub fn new(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self { bids, asks }
    }

    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// True when either side has no levels.
    pub fn is_one_sided(&self) -> bool {
        self.bids.is_empty() || self.asks.is_empty()
    }

    /// Mid price, `None` when either side is empty.
    pub fn mid(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(Price::midpoint(bid.price, ask.price))
    }

    /// Keep at most `depth` levels per side.
    pub fn truncate(&mut self, depth: usize) {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
    }
}
