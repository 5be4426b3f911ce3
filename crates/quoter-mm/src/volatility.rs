//! Rolling mid-price window and return volatility.
//!
//! Volatility is the population standard deviation of per-step returns
//! `(mid[i] - mid[i-1]) / mid[i-1]` over the retained window.

use std::collections::VecDeque;

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use quoter_core::Price;

/// Mid prices retained per job.
pub const MID_WINDOW_CAPACITY: usize = 100;

/// Volatility reported until two samples exist.
pub const DEFAULT_VOLATILITY: Decimal = dec!(0.01);

/// Fixed-capacity FIFO of mid prices.
#[derive(Debug, Clone)]
pub struct MidPriceWindow {
    mids: VecDeque<Decimal>,
    capacity: usize,
}

impl Default for MidPriceWindow {
    fn default() -> Self {
        Self::new(MID_WINDOW_CAPACITY)
    }
}

impl MidPriceWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            mids: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a mid, evicting the oldest when full.
    pub fn push(&mut self, mid: Price) {
        if self.mids.len() == self.capacity {
            self.mids.pop_front();
        }
        self.mids.push_back(mid.inner());
    }

    pub fn len(&self) -> usize {
        self.mids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mids.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<Price> {
        self.mids.back().copied().map(Price::new)
    }

    /// Return volatility, `DEFAULT_VOLATILITY` with fewer than two samples.
    pub fn volatility(&self) -> Decimal {
        if self.mids.len() < 2 {
            return DEFAULT_VOLATILITY;
        }

        let returns: Vec<Decimal> = self
            .mids
            .iter()
            .zip(self.mids.iter().skip(1))
            .filter(|(prev, _)| !prev.is_zero())
            .map(|(prev, next)| (*next - *prev) / *prev)
            .collect();

        if returns.is_empty() {
            return DEFAULT_VOLATILITY;
        }

        let n = Decimal::from(returns.len());
        let mean = returns.iter().copied().sum::<Decimal>() / n;
        let variance = returns
            .iter()
            .map(|r| (*r - mean) * (*r - mean))
            .sum::<Decimal>()
            / n;

        variance.sqrt().unwrap_or(Decimal::ZERO)
    }
}
